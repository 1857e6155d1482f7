use serde::{Deserialize, Serialize};
use std::fmt;

const NATIVE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";
const ALL: &str = "0x0000000000000000000000000000000000000000";

/// Identifier of a fungible coin (token address or symbol).
///
/// Ordering is lexicographic; batches of coins are validated against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoinId(String);

impl CoinId {
    pub fn new(id: impl Into<String>) -> Self {
        CoinId(id.into())
    }

    /// Sentinel for the chain's native currency
    pub fn native() -> Self {
        CoinId(NATIVE.to_string())
    }

    /// Sentinel meaning "every coin" in kill switches
    pub fn all() -> Self {
        CoinId(ALL.to_string())
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE
    }

    pub fn is_all(&self) -> bool {
        self.0 == ALL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CoinId {
    fn from(s: &str) -> Self {
        CoinId(s.to_string())
    }
}

impl From<String> for CoinId {
    fn from(s: String) -> Self {
        CoinId(s)
    }
}
