//! Dutch-auction exchange of collected coins into the target coin
//!
//! Prices open at a multiple of each coin's smoothed historical rate and
//! decay over the EXCHANGE epoch following a time amplifier.

mod burner;
mod params;
mod record;

pub use burner::{BurnerConfig, DutchAuctionBurner, ExchangeTransfer};
pub use params::PriceParameters;
pub use record::{Record, Trade};

#[cfg(test)]
mod tests;
