use feeflow_burner::BurnerConfig;
use feeflow_fees::FeeConfig;
use feeflow_hooks::HookerConfig;
use feeflow_types::{AccountId, CoinId, EpochSchedule};
use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, Result};

/// Configuration for a fee collector and the components it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeCollectorConfig {
    /// Account holding the collected fees
    pub account: AccountId,

    /// Coin everything is exchanged into and forwarded as
    pub target: CoinId,

    /// Coin native currency is wrapped into on intake
    pub wrapped_native: CoinId,

    pub owner: AccountId,
    pub emergency_owner: AccountId,

    pub hooker_account: AccountId,
    pub burner_account: AccountId,

    /// Weekly epoch layout
    pub epochs: EpochSchedule,

    /// Maximum keeper fee per epoch
    pub fees: FeeConfig,

    pub hooker: HookerConfig,
    pub burner: BurnerConfig,
}

impl Default for FeeCollectorConfig {
    fn default() -> Self {
        Self {
            account: AccountId::new("fee_collector"),
            target: CoinId::new("crvUSD"),
            wrapped_native: CoinId::new("WETH"),
            owner: AccountId::new("owner"),
            emergency_owner: AccountId::new("emergency_owner"),
            hooker_account: AccountId::new("hooker"),
            burner_account: AccountId::new("burner"),
            epochs: EpochSchedule::default(),
            fees: FeeConfig::default(),
            hooker: HookerConfig::default(),
            burner: BurnerConfig::default(),
        }
    }
}

impl FeeCollectorConfig {
    /// Parses a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FeeCollectorConfig =
            serde_json::from_str(json).map_err(|e| CollectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.epochs
            .validate()
            .map_err(|e| CollectorError::Config(format!("epochs: {}", e)))?;
        self.fees
            .validate()
            .map_err(|e| CollectorError::Config(format!("fees: {}", e)))?;
        self.burner
            .params
            .validate()
            .map_err(|e| CollectorError::Config(format!("burner: {}", e)))?;

        let accounts = [&self.account, &self.hooker_account, &self.burner_account];
        if accounts.iter().any(|account| account.is_zero()) {
            return Err(CollectorError::Config("component account is zero".to_string()));
        }
        if self.account == self.hooker_account
            || self.account == self.burner_account
            || self.hooker_account == self.burner_account
        {
            return Err(CollectorError::Config(
                "component accounts must be distinct".to_string(),
            ));
        }
        if self.target.is_native() || self.wrapped_native.is_native() {
            return Err(CollectorError::Config(
                "target and wrapped native must be tokens".to_string(),
            ));
        }
        Ok(())
    }
}
