use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::error::{FeeflowError, Result};

pub const DAY: u64 = 24 * 3600;
pub const WEEK: u64 = 7 * DAY;

/// Thursday 2020-09-17 00:00 UTC, a multiple of [`WEEK`]
pub const DEFAULT_ANCHOR: u64 = 1_600_300_800;

/// One of the four weekly phases. Values are single bits so they combine
/// into [`EpochFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Epoch {
    Sleep = 1,
    Collect = 2,
    Exchange = 4,
    Forward = 8,
}

impl Epoch {
    /// In week order
    pub const ALL: [Epoch; 4] = [Epoch::Sleep, Epoch::Collect, Epoch::Exchange, Epoch::Forward];

    pub const fn flag(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Epoch::Sleep => "SLEEP",
            Epoch::Collect => "COLLECT",
            Epoch::Exchange => "EXCHANGE",
            Epoch::Forward => "FORWARD",
        }
    }

    /// Exactly one bit must be set
    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            1 => Ok(Epoch::Sleep),
            2 => Ok(Epoch::Collect),
            4 => Ok(Epoch::Exchange),
            8 => Ok(Epoch::Forward),
            _ => Err(FeeflowError::BadEpoch),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SLEEP" => Some(Epoch::Sleep),
            "COLLECT" => Some(Epoch::Collect),
            "EXCHANGE" => Some(Epoch::Exchange),
            "FORWARD" => Some(Epoch::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BitOr for Epoch {
    type Output = EpochFlags;
    fn bitor(self, other: Self) -> EpochFlags {
        EpochFlags(self.flag() | other.flag())
    }
}

/// Set of epochs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochFlags(u8);

impl EpochFlags {
    pub const EMPTY: EpochFlags = EpochFlags(0);
    pub const ALL: EpochFlags = EpochFlags(0b1111);

    /// Unknown bits are dropped
    pub const fn from_bits(bits: u8) -> Self {
        EpochFlags(bits & 0b1111)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, epoch: Epoch) -> bool {
        self.0 & epoch.flag() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The single epoch in this set; anything else is "Bad Epoch"
    pub fn single(&self) -> Result<Epoch> {
        Epoch::from_flag(self.0)
    }
}

impl From<Epoch> for EpochFlags {
    fn from(epoch: Epoch) -> Self {
        EpochFlags(epoch.flag())
    }
}

impl BitOr for EpochFlags {
    type Output = EpochFlags;
    fn bitor(self, other: Self) -> EpochFlags {
        EpochFlags(self.0 | other.0)
    }
}

impl BitOr<Epoch> for EpochFlags {
    type Output = EpochFlags;
    fn bitor(self, other: Epoch) -> EpochFlags {
        EpochFlags(self.0 | other.flag())
    }
}

/// Weekly layout of the epochs, repeating from `anchor`.
///
/// Epochs follow each other in [`Epoch::ALL`] order and their durations sum
/// to one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    pub anchor: u64,
    pub sleep: u64,
    pub collect: u64,
    pub exchange: u64,
    pub forward: u64,
}

impl Default for EpochSchedule {
    fn default() -> Self {
        EpochSchedule {
            anchor: DEFAULT_ANCHOR,
            sleep: 4 * DAY,
            collect: DAY,
            exchange: DAY,
            forward: DAY,
        }
    }
}

impl EpochSchedule {
    pub fn new(anchor: u64, sleep: u64, collect: u64, exchange: u64, forward: u64) -> Result<Self> {
        let schedule = EpochSchedule {
            anchor,
            sleep,
            collect,
            exchange,
            forward,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [self.sleep, self.collect, self.exchange, self.forward];
        if durations.iter().any(|d| *d == 0) {
            return Err(FeeflowError::BadParameter("empty epoch".to_string()));
        }
        if durations.iter().sum::<u64>() != WEEK {
            return Err(FeeflowError::BadParameter(
                "epoch durations must sum to a week".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds since the start of the week containing `ts`
    pub fn offset_in_week(&self, ts: u64) -> u64 {
        (ts as i128 - self.anchor as i128).rem_euclid(WEEK as i128) as u64
    }

    pub fn week_start(&self, ts: u64) -> u64 {
        ts.saturating_sub(self.offset_in_week(ts))
    }

    /// Calendar week counter; equals `ts / WEEK` for an anchor that is a
    /// multiple of a week
    pub fn week_number(&self, ts: u64) -> u64 {
        let weeks = (ts as i128 - self.anchor as i128).div_euclid(WEEK as i128)
            + (self.anchor / WEEK) as i128;
        weeks.max(0) as u64
    }

    /// `[start, end)` offsets of an epoch inside the week
    pub fn bounds(&self, epoch: Epoch) -> (u64, u64) {
        let collect = self.sleep;
        let exchange = collect + self.collect;
        let forward = exchange + self.exchange;
        match epoch {
            Epoch::Sleep => (0, collect),
            Epoch::Collect => (collect, exchange),
            Epoch::Exchange => (exchange, forward),
            Epoch::Forward => (forward, WEEK),
        }
    }

    pub fn duration(&self, epoch: Epoch) -> u64 {
        let (start, end) = self.bounds(epoch);
        end - start
    }

    /// The epoch active at `ts`
    pub fn epoch(&self, ts: u64) -> Epoch {
        let offset = self.offset_in_week(ts);
        Epoch::ALL
            .into_iter()
            .find(|epoch| offset < self.bounds(*epoch).1)
            .unwrap_or(Epoch::Forward)
    }

    /// Absolute `[start, end)` of `epoch` in the week containing `ts`
    pub fn frame(&self, epoch: Epoch, ts: u64) -> (u64, u64) {
        let week_start = self.week_start(ts);
        let (start, end) = self.bounds(epoch);
        (week_start + start, week_start + end)
    }

    /// Like [`EpochSchedule::frame`] but takes a flag set, rejecting anything
    /// that is not a single epoch
    pub fn epoch_time_frame(&self, flags: impl Into<EpochFlags>, ts: u64) -> Result<(u64, u64)> {
        let epoch = flags.into().single()?;
        Ok(self.frame(epoch, ts))
    }

    /// Next timestamp at or after `ts` where `epoch` begins
    pub fn next_start(&self, epoch: Epoch, ts: u64) -> u64 {
        let (start, _) = self.frame(epoch, ts);
        if ts <= start {
            start
        } else {
            start + WEEK
        }
    }

    /// Fails with a retry hint unless `ts` falls inside `epoch`
    pub fn ensure_epoch(&self, epoch: Epoch, ts: u64) -> Result<()> {
        if self.epoch(ts) == epoch {
            Ok(())
        } else {
            Err(FeeflowError::WrongEpoch {
                expected: epoch,
                retry_at: self.next_start(epoch, ts),
            })
        }
    }
}
