//! Fixed-point helpers on `u128` with 18 decimals ("WAD").
//!
//! All operations truncate toward zero and report overflow instead of
//! wrapping.

use crate::error::{FeeflowError, Result};
use ethnum::U256;

/// 1.0 in fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// ln(2) in fixed point
pub const LN2_WAD: u128 = 693_147_180_559_945_309;

/// `a * b / denominator` over a 256-bit intermediate, so it only fails
/// when the quotient itself does not fit.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(FeeflowError::Overflow("division by zero".to_string()));
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(FeeflowError::Overflow(format!("{} * {} / {}", a, b, denominator)));
    }
    Ok(quotient.as_u128())
}

/// e^x for `x >= 0` in fixed point.
///
/// Range-reduced as `2^k * e^r` with `r < ln 2`, then a Taylor series on `r`.
pub fn wad_exp(x: u128) -> Result<u128> {
    let k = x / LN2_WAD;
    let r = x - k * LN2_WAD;

    let mut term = WAD;
    let mut sum = WAD;
    for i in 1..=48u128 {
        term = term * r / (WAD * i);
        if term == 0 {
            break;
        }
        sum += term;
    }

    if k >= 64 {
        return Err(FeeflowError::Overflow(format!("exp of {}", x)));
    }
    sum.checked_mul(1u128 << k)
        .ok_or_else(|| FeeflowError::Overflow(format!("exp of {}", x)))
}

/// `(base^(remaining/whole) - 1) / (base - 1)` in fixed point.
///
/// `base` and `log_base` (its natural logarithm) are fixed point; `base`
/// must exceed 1.0. The result lies in `[0, WAD]`: 0 with nothing remaining,
/// 1.0 with the whole period remaining.
pub fn time_amplifier(remaining: u64, whole: u64, base: u128, log_base: u128) -> Result<u128> {
    if whole == 0 {
        return Err(FeeflowError::BadParameter("empty period".to_string()));
    }
    if base <= WAD {
        return Err(FeeflowError::BadParameter("amplifier base must exceed 1.0".to_string()));
    }
    let remaining = remaining.min(whole);
    let exponent = mul_div(log_base, remaining as u128, whole as u128)?;
    let grown = wad_exp(exponent)?.saturating_sub(WAD);
    Ok(mul_div(grown, WAD, base - WAD)?.min(WAD))
}
