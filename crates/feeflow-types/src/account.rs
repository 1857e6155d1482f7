use serde::{Deserialize, Serialize};
use std::fmt;

const ZERO: &str = "0x0000000000000000000000000000000000000000";

/// Account identifier (address string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    /// The empty address; hooks targeting it make no call
    pub fn zero() -> Self {
        AccountId(ZERO.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        AccountId(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId(s.to_string())
    }
}
