use feeflow_types::{AccountId, Amount, CoinId, Inventory, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fungible-token capability the engine is handed.
///
/// Mirrors ERC-20 semantics: balances, allowances, `transfer` and
/// `transfer_from`. The native currency is the coin [`CoinId::native`].
/// Implementations may be in-memory, database-backed or bridged to a chain.
pub trait Ledger {
    /// Credit coins arriving from outside the ledger (fees, funding)
    fn deposit(&mut self, to: &AccountId, coin: &CoinId, amount: Amount) -> Result<()>;

    /// Debit coins leaving the ledger (e.g. native currency being wrapped)
    fn withdraw(&mut self, from: &AccountId, coin: &CoinId, amount: Amount) -> Result<()>;

    /// Move coins owned by `from`
    fn transfer(&mut self, from: &AccountId, to: &AccountId, coin: &CoinId, amount: Amount)
        -> Result<()>;

    /// Set the amount `spender` may move out of `owner`'s balance
    fn approve(&mut self, owner: &AccountId, spender: &AccountId, coin: &CoinId, amount: Amount)
        -> Result<()>;

    /// Move coins of `owner` on behalf of `spender`, consuming allowance.
    /// An allowance of [`Amount::MAX`] is never consumed.
    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        coin: &CoinId,
        amount: Amount,
    ) -> Result<()>;

    fn balance_of(&self, account: &AccountId, coin: &CoinId) -> Amount;

    fn allowance(&self, owner: &AccountId, spender: &AccountId, coin: &CoinId) -> Amount;

    /// Get all balances for an account
    fn account_balances(&self, account: &AccountId) -> Inventory;

    fn has_sufficient(&self, account: &AccountId, coin: &CoinId, required: Amount) -> bool {
        self.balance_of(account, coin) >= required
    }

    /// List all accounts holding something
    fn list_accounts(&self) -> Vec<AccountId>;

    /// Capture the full state, used to unwind a failed call
    fn snapshot(&self) -> LedgerSnapshot;

    /// Restore from a snapshot
    fn restore(&mut self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// Snapshot of ledger state for checkpoint/restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<AccountId, Inventory>,
    /// owner -> spender -> allowance per coin
    pub allowances: BTreeMap<AccountId, BTreeMap<AccountId, Inventory>>,
}
