use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Create the API application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health and status
        .route("/health", get(handlers::health))
        .route("/v1/status", get(handlers::get_status))

        // Epoch clock and keeper fees
        .route("/v1/epoch", get(handlers::get_epoch))
        .route("/v1/epochs/:flag/frame", get(handlers::get_epoch_frame))
        .route("/v1/fees/:flag", get(handlers::get_fee))

        // Hooks
        .route("/v1/hooks", get(handlers::list_hooks))
        .route("/v1/hooks/compensation", post(handlers::calc_compensation))

        // Auction
        .route("/v1/burner/price/:coin", get(handlers::get_price))
        .route("/v1/burner/records/:coin", get(handlers::get_record))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
