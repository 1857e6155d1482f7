use serde::{Deserialize, Serialize};

use crate::error::{FeeflowError, Result};
use crate::AccountId;

/// Privileged accounts of a component.
///
/// The owner may do everything; the emergency owner only the operations
/// guarded by [`Authority::ensure_admin`] (recovery, kill switches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    owner: AccountId,
    emergency_owner: AccountId,
}

impl Authority {
    pub fn new(owner: AccountId, emergency_owner: AccountId) -> Self {
        Authority {
            owner,
            emergency_owner,
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn emergency_owner(&self) -> &AccountId {
        &self.emergency_owner
    }

    pub fn ensure_owner(&self, caller: &AccountId) -> Result<()> {
        if caller == &self.owner {
            Ok(())
        } else {
            Err(FeeflowError::OnlyOwner)
        }
    }

    /// Owner or emergency owner
    pub fn ensure_admin(&self, caller: &AccountId) -> Result<()> {
        if caller == &self.owner || caller == &self.emergency_owner {
            Ok(())
        } else {
            Err(FeeflowError::OnlyOwner)
        }
    }

    pub fn set_owner(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<()> {
        self.ensure_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    pub fn set_emergency_owner(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<()> {
        self.ensure_owner(caller)?;
        self.emergency_owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_emergency_rights() {
        let admin = AccountId::new("admin");
        let emergency = AccountId::new("emergency");
        let arve = AccountId::new("arve");
        let mut authority = Authority::new(admin.clone(), emergency.clone());

        assert!(authority.ensure_owner(&admin).is_ok());
        assert!(authority.ensure_admin(&emergency).is_ok());
        assert_eq!(authority.ensure_owner(&emergency), Err(FeeflowError::OnlyOwner));
        assert_eq!(authority.ensure_admin(&arve), Err(FeeflowError::OnlyOwner));

        assert!(authority.set_owner(&emergency, arve.clone()).is_err());
        authority.set_owner(&admin, arve.clone()).unwrap();
        assert!(authority.ensure_owner(&arve).is_ok());
        assert!(authority.ensure_owner(&admin).is_err());
    }
}
