use feeflow_types::{mul_div, Amount, FeeflowError, Result, WAD};
use serde::{Deserialize, Serialize};

/// Volume traded for one coin within a week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub coin_amount: Amount,
    pub target_amount: Amount,
}

impl Trade {
    pub fn new(coin_amount: Amount, target_amount: Amount) -> Self {
        Trade {
            coin_amount,
            target_amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coin_amount.is_zero() && self.target_amount.is_zero()
    }

    /// `smoothing * self + (1 - smoothing) * other`, per field
    fn blend(&self, other: &Trade, smoothing: u128) -> Result<Trade> {
        let rest = WAD - smoothing;
        let mix = |old: Amount, new: Amount| -> Result<Amount> {
            let kept = mul_div(old.raw(), smoothing, WAD)?;
            let added = mul_div(new.raw(), rest, WAD)?;
            kept.checked_add(added)
                .map(Amount::from_raw)
                .ok_or_else(|| FeeflowError::Overflow("record blend".to_string()))
        };
        Ok(Trade {
            coin_amount: mix(self.coin_amount, other.coin_amount)?,
            target_amount: mix(self.target_amount, other.target_amount)?,
        })
    }
}

/// Smoothed trading history of one coin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub previous: Trade,
    pub current: Trade,
    /// Week number `current` belongs to
    pub week: u64,
}

impl Record {
    /// This record as seen in `week`. Moving to a later week folds
    /// `current` into `previous` once, however many weeks passed.
    pub fn rolled(&self, week: u64, smoothing: u128) -> Result<Record> {
        if week <= self.week {
            return Ok(*self);
        }
        if smoothing > WAD {
            return Err(FeeflowError::BadParameter("smoothing factor above 1.0".to_string()));
        }
        Ok(Record {
            previous: self.previous.blend(&self.current, smoothing)?,
            current: Trade::default(),
            week,
        })
    }

    pub fn add(&mut self, coin_amount: Amount, target_amount: Amount) -> Result<()> {
        self.current.coin_amount = self.current.coin_amount.checked_add(coin_amount)?;
        self.current.target_amount = self.current.target_amount.checked_add(target_amount)?;
        Ok(())
    }

    /// Target paid per coin unit over both buckets, scaled by 10^18.
    /// `None` until both sides of the history are non-zero.
    pub fn rate(&self) -> Result<Option<u128>> {
        let coins = self.previous.coin_amount.checked_add(self.current.coin_amount)?;
        let target = self.previous.target_amount.checked_add(self.current.target_amount)?;
        if coins.is_zero() || target.is_zero() {
            return Ok(None);
        }
        match mul_div(target.raw(), WAD, coins.raw())? {
            0 => Ok(None),
            rate => Ok(Some(rate)),
        }
    }
}
