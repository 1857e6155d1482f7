use feeflow_fees::FeeConfig;
use feeflow_types::{Amount, CoinId, Epoch, EpochFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a fee collector at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatus {
    pub ts: u64,
    pub epoch: Epoch,
    pub week: u64,
    /// `[start, end)` of the current epoch
    pub epoch_start: u64,
    pub epoch_end: u64,
    pub target: CoinId,
    pub target_balance: Amount,
    pub max_fees: FeeConfig,
    /// Keeper fee fraction of the current epoch at `ts`
    pub current_fee: u128,
    pub killed: BTreeMap<CoinId, EpochFlags>,
    pub hooks: usize,
    pub hooks_version: u64,
    pub duty_counter: u64,
    pub hooker_allowance: Amount,
}

impl CollectorStatus {
    /// Whether the week's mandatory duties were already run
    pub fn duties_done(&self) -> bool {
        self.duty_counter >= self.week
    }
}
