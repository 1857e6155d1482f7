use crate::{Amount, CoinId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coin balances of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub units: BTreeMap<CoinId, Amount>,
}

impl Inventory {
    /// Create a new empty inventory
    pub fn new() -> Self {
        Inventory {
            units: BTreeMap::new(),
        }
    }

    /// Get balance for a coin (returns 0 if not present)
    pub fn get(&self, coin: &CoinId) -> Amount {
        self.units.get(coin).copied().unwrap_or(Amount::ZERO)
    }

    /// Set balance for a coin; zero balances are not stored
    pub fn set(&mut self, coin: &CoinId, amount: Amount) {
        if amount.is_zero() {
            self.units.remove(coin);
        } else {
            self.units.insert(coin.clone(), amount);
        }
    }

    pub fn add(&mut self, coin: &CoinId, delta: Amount) -> crate::Result<()> {
        let new_amount = self.get(coin).checked_add(delta)?;
        self.set(coin, new_amount);
        Ok(())
    }

    pub fn sub(&mut self, coin: &CoinId, delta: Amount) -> crate::Result<()> {
        let new_amount = self.get(coin).checked_sub(delta)?;
        self.set(coin, new_amount);
        Ok(())
    }

    /// Coins with non-zero balances
    pub fn coins(&self) -> Vec<CoinId> {
        self.units.keys().cloned().collect()
    }

    pub fn has_sufficient(&self, coin: &CoinId, required: Amount) -> bool {
        self.get(coin) >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_operations() {
        let crv = CoinId::new("CRV");
        let mut inv = Inventory::new();

        inv.add(&crv, Amount::from_raw(100)).unwrap();
        assert_eq!(inv.get(&crv), Amount::from_raw(100));

        inv.sub(&crv, Amount::from_raw(30)).unwrap();
        assert_eq!(inv.get(&crv), Amount::from_raw(70));

        assert!(inv.has_sufficient(&crv, Amount::from_raw(50)));
        assert!(!inv.has_sufficient(&crv, Amount::from_raw(100)));
        assert!(inv.sub(&crv, Amount::from_raw(71)).is_err());

        inv.sub(&crv, Amount::from_raw(70)).unwrap();
        assert!(inv.coins().is_empty());
    }
}
