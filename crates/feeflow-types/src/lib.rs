mod coin;
mod amount;
mod account;
mod authority;
mod context;
mod epoch;
mod inventory;
mod math;
mod error;

pub use coin::CoinId;
pub use amount::Amount;
pub use account::AccountId;
pub use authority::Authority;
pub use context::CallContext;
pub use epoch::{Epoch, EpochFlags, EpochSchedule, DAY, DEFAULT_ANCHOR, WEEK};
pub use inventory::Inventory;
pub use math::{mul_div, time_amplifier, wad_exp, LN2_WAD, WAD};
pub use error::{FeeflowError, Result};

#[cfg(test)]
mod tests;
