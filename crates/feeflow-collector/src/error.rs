use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectorError>;

/// Errors surfaced by the fee collector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Core(#[from] feeflow_types::FeeflowError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CollectorError {
    /// The underlying engine error, if this is one
    pub fn core(&self) -> Option<&feeflow_types::FeeflowError> {
        match self {
            CollectorError::Core(err) => Some(err),
            CollectorError::Config(_) => None,
        }
    }
}
