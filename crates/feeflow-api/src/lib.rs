//! Read-only HTTP views over a fee collector

mod handlers;
mod server;
mod state;

pub use server::create_app;
pub use state::AppState;
