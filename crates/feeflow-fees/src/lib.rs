mod fee_policy;

pub use fee_policy::{FeeConfig, FeeCurve, FeeSchedule, LinearFeeCurve};

#[cfg(test)]
mod tests;
