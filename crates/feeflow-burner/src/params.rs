use feeflow_types::{time_amplifier, wad_exp, Amount, FeeflowError, Result, WAD};
use serde::{Deserialize, Serialize};

/// ln(10) scaled by 10^18
const LN10_WAD: u128 = 2_302_585_092_994_045_684;

/// Auction tuning. Fractions and multipliers are scaled by 10^18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceParameters {
    /// Steepness of the price decay, above 1.0
    pub amplifier_base: u128,
    /// Natural logarithm of `amplifier_base`
    pub log_amplifier_base: u128,
    /// Weight of the older bucket when a record rolls over
    pub smoothing_factor: u128,
    /// Smallest target value a single transfer may fetch
    pub min_exchange_amount: Amount,
    /// Opening price as a multiple of the reference rate
    pub price_ceiling: u128,
    /// Closing price as a multiple of the reference rate
    pub price_floor: u128,
    /// Reference rate for coins without trade history
    pub default_rate: u128,
}

impl Default for PriceParameters {
    fn default() -> Self {
        PriceParameters {
            amplifier_base: 10 * WAD,
            log_amplifier_base: LN10_WAD,
            smoothing_factor: WAD / 2,
            min_exchange_amount: Amount::ZERO,
            price_ceiling: 2 * WAD,
            price_floor: WAD / 2,
            default_rate: WAD,
        }
    }
}

impl PriceParameters {
    pub fn validate(&self) -> Result<()> {
        if self.amplifier_base <= WAD {
            return Err(FeeflowError::BadParameter(
                "amplifier base must exceed 1.0".to_string(),
            ));
        }
        if self.smoothing_factor > WAD {
            return Err(FeeflowError::BadParameter(
                "smoothing factor above 1.0".to_string(),
            ));
        }
        if self.price_floor >= self.price_ceiling {
            return Err(FeeflowError::BadParameter(
                "price floor must be below ceiling".to_string(),
            ));
        }
        if self.default_rate == 0 {
            return Err(FeeflowError::BadParameter("zero default rate".to_string()));
        }
        // e^log must land within 0.01% of the base
        let base = wad_exp(self.log_amplifier_base)?;
        if self.log_amplifier_base == 0 || base.abs_diff(self.amplifier_base) > self.amplifier_base / 10_000 {
            return Err(FeeflowError::BadParameter(
                "log amplifier base does not match amplifier base".to_string(),
            ));
        }
        Ok(())
    }

    /// Share of the ceiling-to-floor spread still left with `remaining` of
    /// `whole` seconds to go
    pub fn time_amplifier(&self, remaining: u64, whole: u64) -> Result<u128> {
        time_amplifier(remaining, whole, self.amplifier_base, self.log_amplifier_base)
    }
}
