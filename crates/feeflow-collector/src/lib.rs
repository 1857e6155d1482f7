//! Weekly fee collector: intake, keeper-paid collection, Dutch-auction
//! exchange into the target coin and forwarding to the hooker.

mod collector;
mod config;
mod error;
mod state;

pub use collector::{Callback, FeeCollector};
pub use config::FeeCollectorConfig;
pub use error::{CollectorError, Result};
pub use state::CollectorStatus;
