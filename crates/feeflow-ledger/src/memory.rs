use feeflow_types::{AccountId, Amount, CoinId, FeeflowError, Inventory, Result};
use std::collections::BTreeMap;

use crate::ledger::{Ledger, LedgerSnapshot};

/// In-memory ledger implementation
/// Suitable for testing, simulation and the HTTP views
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    accounts: BTreeMap<AccountId, Inventory>,
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Inventory>>,
}

impl MemoryLedger {
    /// Create a new empty in-memory ledger
    pub fn new() -> Self {
        MemoryLedger {
            accounts: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    /// Initialize with pre-funded accounts
    pub fn with_accounts(accounts: BTreeMap<AccountId, Inventory>) -> Self {
        MemoryLedger {
            accounts,
            allowances: BTreeMap::new(),
        }
    }

    fn get_or_create_account_mut(&mut self, account: &AccountId) -> &mut Inventory {
        self.accounts
            .entry(account.clone())
            .or_insert_with(Inventory::new)
    }

    fn debit(&mut self, from: &AccountId, coin: &CoinId, amount: Amount) -> Result<()> {
        if self.balance_of(from, coin) < amount {
            return Err(FeeflowError::InsufficientBalance(
                from.to_string(),
                coin.to_string(),
            ));
        }
        self.get_or_create_account_mut(from).sub(coin, amount)
    }

    fn credit(&mut self, to: &AccountId, coin: &CoinId, amount: Amount) -> Result<()> {
        self.get_or_create_account_mut(to).add(coin, amount)
    }
}

impl Ledger for MemoryLedger {
    fn deposit(&mut self, to: &AccountId, coin: &CoinId, amount: Amount) -> Result<()> {
        self.credit(to, coin, amount)
    }

    fn withdraw(&mut self, from: &AccountId, coin: &CoinId, amount: Amount) -> Result<()> {
        self.debit(from, coin, amount)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        coin: &CoinId,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(()); // No-op for zero transfers
        }
        tracing::trace!("transfer {} {} from {} to {}", amount, coin, from, to);

        self.debit(from, coin, amount)?;
        self.credit(to, coin, amount)
    }

    fn approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        coin: &CoinId,
        amount: Amount,
    ) -> Result<()> {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .entry(spender.clone())
            .or_default()
            .set(coin, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        coin: &CoinId,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let allowed = self.allowance(owner, spender, coin);
        if allowed < amount {
            return Err(FeeflowError::InsufficientAllowance(
                owner.to_string(),
                spender.to_string(),
                coin.to_string(),
            ));
        }

        self.transfer(owner, to, coin, amount)?;
        if allowed != Amount::MAX {
            self.approve(owner, spender, coin, allowed - amount)?;
        }
        Ok(())
    }

    fn balance_of(&self, account: &AccountId, coin: &CoinId) -> Amount {
        self.accounts
            .get(account)
            .map(|inv| inv.get(coin))
            .unwrap_or(Amount::ZERO)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId, coin: &CoinId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .map(|inv| inv.get(coin))
            .unwrap_or(Amount::ZERO)
    }

    fn account_balances(&self, account: &AccountId) -> Inventory {
        self.accounts
            .get(account)
            .cloned()
            .unwrap_or_else(Inventory::new)
    }

    fn list_accounts(&self) -> Vec<AccountId> {
        self.accounts
            .iter()
            .filter(|(_, inv)| !inv.units.is_empty())
            .map(|(account, _)| account.clone())
            .collect()
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self.accounts.clone(),
            allowances: self.allowances.clone(),
        }
    }

    fn restore(&mut self, snapshot: &LedgerSnapshot) -> Result<()> {
        self.accounts = snapshot.accounts.clone();
        self.allowances = snapshot.allowances.clone();
        Ok(())
    }
}
