use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount};

/// Who is calling, with how much native value attached, and when.
///
/// Every state-changing entry point takes one; "now" never comes from a
/// global clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: AccountId,
    pub value: Amount,
    pub ts: u64,
}

impl CallContext {
    pub fn new(caller: AccountId, ts: u64) -> Self {
        CallContext {
            caller,
            value: Amount::ZERO,
            ts,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Same call as seen by a nested callee
    pub fn forwarded(&self, caller: AccountId, value: Amount) -> Self {
        CallContext {
            caller,
            value,
            ts: self.ts,
        }
    }
}
