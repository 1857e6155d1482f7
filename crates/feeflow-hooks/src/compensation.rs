use feeflow_types::{mul_div, EpochSchedule, FeeflowError, Result, WEEK};
use serde::{Deserialize, Serialize};

/// Seconds-within-the-week interval `[start, end)`.
///
/// `end < start` wraps over the week boundary; `start == end` covers the
/// whole week beginning at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub const FULL_WEEK: Window = Window { start: 0, end: 0 };

    pub fn new(start: u64, end: u64) -> Result<Self> {
        let window = Window { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= WEEK {
            return Err(FeeflowError::BadStartTime);
        }
        if self.end >= WEEK {
            return Err(FeeflowError::BadEndTime);
        }
        Ok(())
    }

    pub fn duration(&self) -> u64 {
        if self.end > self.start {
            self.end - self.start
        } else {
            WEEK - self.start + self.end
        }
    }

    /// Seconds since the window opened, or `None` when `offset` (seconds
    /// into the week) lies outside it
    pub fn elapsed(&self, offset: u64) -> Option<u64> {
        let elapsed = (offset % WEEK + WEEK - self.start) % WEEK;
        (elapsed < self.duration()).then_some(elapsed)
    }
}

/// When a hook pays, matched exhaustively by [`CompensationStrategy::payout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    /// Full amount at any time
    Always,
    /// Full amount inside the window, nothing outside
    Window(Window),
    /// Linear ramp from 0 at the window start towards the full amount at
    /// its end, nothing outside
    Dutch(Window),
}

impl Schedule {
    fn window_start(&self) -> u64 {
        match self {
            Schedule::Always => 0,
            Schedule::Window(window) | Schedule::Dutch(window) => window.start,
        }
    }
}

/// Per-hook payout limiter.
///
/// A period is one week counted from the hook's window start, numbered like
/// [`EpochSchedule::week_number`]. At most `limit` payouts happen per period;
/// a `period` set in the future blocks payouts until that week arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub period: u64,
    pub used: u64,
    pub limit: u64,
}

impl Cooldown {
    pub fn new(limit: u64) -> Self {
        Cooldown {
            period: 0,
            used: 0,
            limit,
        }
    }

    /// Takes one credit in `period` if any is left
    fn take(&mut self, period: u64) -> bool {
        if self.period > period {
            return false;
        }
        if self.period < period {
            self.period = period;
            self.used = 0;
        }
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationStrategy {
    /// Payout, or the ramp's ceiling for Dutch schedules
    pub amount: u128,
    pub cooldown: Cooldown,
    pub schedule: Schedule,
}

impl CompensationStrategy {
    pub fn always(amount: u128, limit: u64) -> Self {
        CompensationStrategy {
            amount,
            cooldown: Cooldown::new(limit),
            schedule: Schedule::Always,
        }
    }

    /// Zero-paying strategy for mandatory work
    pub fn duty() -> Self {
        Self::always(0, 0)
    }

    /// Builds a strategy from the flat `(start, end, dutch)` form used in
    /// configuration files
    pub fn from_parts(amount: u128, cooldown: Cooldown, start: u64, end: u64, dutch: bool) -> Result<Self> {
        let window = Window::new(start, end)?;
        let schedule = match (dutch, start == end) {
            (true, _) => Schedule::Dutch(window),
            (false, true) => Schedule::Always,
            (false, false) => Schedule::Window(window),
        };
        Ok(CompensationStrategy {
            amount,
            cooldown,
            schedule,
        })
    }

    pub fn validate(&self) -> Result<()> {
        match self.schedule {
            Schedule::Always => Ok(()),
            Schedule::Window(window) | Schedule::Dutch(window) => window.validate(),
        }
    }

    /// Largest total a single period can pay
    pub fn max_per_period(&self) -> Result<u128> {
        self.amount
            .checked_mul(self.cooldown.limit as u128)
            .ok_or_else(|| FeeflowError::Overflow("buffer amount".to_string()))
    }

    /// What the schedule offers at `ts`, ignoring the cooldown
    pub fn offered(&self, clock: &EpochSchedule, ts: u64) -> Result<u128> {
        let offset = clock.offset_in_week(ts);
        match self.schedule {
            Schedule::Always => Ok(self.amount),
            Schedule::Window(window) => Ok(match window.elapsed(offset) {
                Some(_) => self.amount,
                None => 0,
            }),
            Schedule::Dutch(window) => match window.elapsed(offset) {
                Some(elapsed) => mul_div(self.amount, elapsed as u128, window.duration() as u128),
                None => Ok(0),
            },
        }
    }

    /// Amount paid at `ts`, consuming a cooldown credit when it is non-zero
    pub fn payout(&self, cooldown: &mut Cooldown, clock: &EpochSchedule, ts: u64) -> Result<u128> {
        let offered = self.offered(clock, ts)?;
        if offered == 0 {
            return Ok(0);
        }
        let period = clock.week_number(ts.saturating_sub(self.schedule.window_start()));
        Ok(if cooldown.take(period) { offered } else { 0 })
    }
}
