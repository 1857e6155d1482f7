use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::error::{FeeflowError, Result};
use crate::math::{mul_div, WAD};

/// Raw token amount in the coin's smallest unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    /// Zero amount
    pub const ZERO: Amount = Amount(0);

    /// Largest representable amount, also used as "everything" in recover calls
    pub const MAX: Amount = Amount(u128::MAX);

    /// Create from raw units
    pub const fn from_raw(raw: u128) -> Self {
        Amount(raw)
    }

    /// Get the raw value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// `units * 10^decimals`
    pub fn from_units(units: u128, decimals: u32) -> Result<Self> {
        10u128
            .checked_pow(decimals)
            .and_then(|scale| units.checked_mul(scale))
            .map(Amount)
            .ok_or_else(|| FeeflowError::Overflow(format!("{} * 10^{}", units, decimals)))
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| FeeflowError::Overflow("overflow in addition".to_string()))
    }

    pub fn checked_sub(&self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or_else(|| FeeflowError::Overflow("underflow in subtraction".to_string()))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul_int(&self, factor: u128) -> Result<Self> {
        self.0
            .checked_mul(factor)
            .map(Amount)
            .ok_or_else(|| FeeflowError::Overflow("overflow in multiplication".to_string()))
    }

    /// `self * numerator / denominator`, truncating
    pub fn mul_div(&self, numerator: u128, denominator: u128) -> Result<Self> {
        mul_div(self.0, numerator, denominator).map(Amount)
    }

    /// Multiply by a fraction scaled by 10^18, truncating
    pub fn mul_wad(&self, fraction: u128) -> Result<Self> {
        self.mul_div(fraction, WAD)
    }
}

impl From<u128> for Amount {
    fn from(raw: u128) -> Self {
        Amount(raw)
    }
}

// Panics on overflow like the primitive operators; engine code goes through
// the checked variants.
impl Add for Amount {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Amount(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Amount(self.0 - other.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
