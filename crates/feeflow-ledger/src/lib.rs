mod ledger;
mod memory;

pub use ledger::{Ledger, LedgerSnapshot};
pub use memory::MemoryLedger;
