use feeflow_api::{create_app, AppState};
use feeflow_collector::FeeCollectorConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // FEEFLOW_CONFIG points at a JSON FeeCollectorConfig
    let config = match std::env::var("FEEFLOW_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading config from {}", path);
            FeeCollectorConfig::from_json_str(&std::fs::read_to_string(path)?)?
        }
        Err(_) => FeeCollectorConfig::default(),
    };
    let state = AppState::from_config(config)?;
    let app = create_app(state);

    let addr = std::env::var("FEEFLOW_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("feeflow API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
