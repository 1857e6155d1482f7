use thiserror::Error;

use crate::Epoch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeflowError {
    #[error("Bad Epoch")]
    BadEpoch,

    #[error("Bad time")]
    BadTime,

    #[error("Bad max_fee")]
    BadMaxFee,

    #[error("Bad start time")]
    BadStartTime,

    #[error("Bad end time")]
    BadEndTime,

    #[error("Bad parameter: {0}")]
    BadParameter(String),

    #[error("Hooks not sorted")]
    HooksNotSorted,

    #[error("Coins not sorted")]
    CoinsNotSorted,

    #[error("Not all mandatory hooks")]
    NotAllMandatoryHooks,

    #[error("Not all duties")]
    NotAllDuties,

    #[error("Unknown hook: {0}")]
    UnknownHook(usize),

    #[error("Too small: {0}")]
    TooSmall(String),

    #[error("Only owner")]
    OnlyOwner,

    #[error("Only FeeCollector")]
    OnlyFeeCollector,

    /// Called outside the epoch the entry point belongs to; `retry_at` is the
    /// next timestamp at which the call can succeed.
    #[error("Wrong epoch: expected {expected}, try again at {retry_at}")]
    WrongEpoch { expected: Epoch, retry_at: u64 },

    #[error("Killed: {coin} in {epoch}")]
    Killed { coin: String, epoch: Epoch },

    #[error("Insufficient balance: account={0}, coin={1}")]
    InsufficientBalance(String, String),

    #[error("Insufficient allowance: owner={0}, spender={1}, coin={2}")]
    InsufficientAllowance(String, String, String),

    #[error("Insufficient value: attached {attached}, required {required}")]
    InsufficientValue { attached: u128, required: u128 },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Hook call failed: target={target}, reason={reason}")]
    HookCallFailed { target: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FeeflowError>;
