use feeflow_types::{mul_div, Amount, Epoch, EpochFlags, EpochSchedule, FeeflowError, Result, WAD};
use serde::{Deserialize, Serialize};

/// Maximum keeper fee per epoch, as a fraction scaled by 10^18
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub sleep: u128,
    pub collect: u128,
    pub exchange: u128,
    pub forward: u128,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            sleep: 0,
            collect: 2 * WAD / 100, // 2%
            exchange: 0,
            forward: WAD / 100, // 1%
        }
    }
}

impl FeeConfig {
    pub fn get(&self, epoch: Epoch) -> u128 {
        match epoch {
            Epoch::Sleep => self.sleep,
            Epoch::Collect => self.collect,
            Epoch::Exchange => self.exchange,
            Epoch::Forward => self.forward,
        }
    }

    fn slot_mut(&mut self, epoch: Epoch) -> &mut u128 {
        match epoch {
            Epoch::Sleep => &mut self.sleep,
            Epoch::Collect => &mut self.collect,
            Epoch::Exchange => &mut self.exchange,
            Epoch::Forward => &mut self.forward,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if Epoch::ALL.iter().any(|epoch| self.get(*epoch) > WAD) {
            return Err(FeeflowError::BadMaxFee);
        }
        Ok(())
    }
}

/// Shape of the keeper fee inside an epoch window.
///
/// Implementations must be non-decreasing in `elapsed`, return at most
/// `max_fee`, and reach at least 90% of it by the end of the window.
pub trait FeeCurve {
    fn fee(&self, max_fee: u128, elapsed: u64, window: u64) -> u128;
}

/// `elapsed * max_fee / window`, truncating
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearFeeCurve;

impl FeeCurve for LinearFeeCurve {
    fn fee(&self, max_fee: u128, elapsed: u64, window: u64) -> u128 {
        if window == 0 || elapsed >= window {
            return max_fee;
        }
        // elapsed < window, so the quotient is below max_fee and cannot overflow
        mul_div(max_fee, elapsed as u128, window as u128).unwrap_or(max_fee)
    }
}

/// Per-epoch keeper fee evaluated against the epoch clock
#[derive(Debug, Clone)]
pub struct FeeSchedule<C = LinearFeeCurve> {
    config: FeeConfig,
    curve: C,
}

impl FeeSchedule<LinearFeeCurve> {
    pub fn new(config: FeeConfig) -> Result<Self> {
        Self::with_curve(config, LinearFeeCurve)
    }

    pub fn with_defaults() -> Self {
        FeeSchedule {
            config: FeeConfig::default(),
            curve: LinearFeeCurve,
        }
    }
}

impl<C: FeeCurve> FeeSchedule<C> {
    pub fn with_curve(config: FeeConfig, curve: C) -> Result<Self> {
        config.validate()?;
        Ok(FeeSchedule { config, curve })
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    pub fn max_fee(&self, epoch: Epoch) -> u128 {
        self.config.get(epoch)
    }

    /// Rejects anything but a single epoch flag and fractions above 1.0.
    /// Authorization is the caller's business.
    pub fn set_max_fee(&mut self, flags: impl Into<EpochFlags>, max_fee: u128) -> Result<()> {
        let epoch = flags.into().single()?;
        if max_fee > WAD {
            return Err(FeeflowError::BadMaxFee);
        }
        *self.config.slot_mut(epoch) = max_fee;
        tracing::debug!("max_fee for {} set to {}", epoch, max_fee);
        Ok(())
    }

    /// Keeper fee fraction for `epoch` at `ts`: 0 before the epoch's window
    /// in the week of `ts`, `max_fee` after it
    pub fn fee(&self, clock: &EpochSchedule, epoch: Epoch, ts: u64) -> u128 {
        let max_fee = self.config.get(epoch);
        let (start, end) = clock.frame(epoch, ts);
        if ts < start {
            return 0;
        }
        self.curve
            .fee(max_fee, ts - start, end - start)
            .min(max_fee)
    }

    /// Keeper share of `amount` at `ts`
    pub fn apply(&self, clock: &EpochSchedule, amount: Amount, epoch: Epoch, ts: u64) -> Result<Amount> {
        amount.mul_wad(self.fee(clock, epoch, ts))
    }
}

impl Default for FeeSchedule<LinearFeeCurve> {
    fn default() -> Self {
        Self::with_defaults()
    }
}
