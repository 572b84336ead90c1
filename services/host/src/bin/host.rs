//! services/host/src/bin/host.rs

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use host_lib::{
    adapters::HttpScoringGateway,
    config::Config,
    error::HostError,
    web::{router, AppState},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), HostError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting host...");

    // --- 2. Initialize the Scoring Gateway ---
    let http_client = reqwest::Client::builder().timeout(config.request_timeout).build()?;
    let gateway = Arc::new(HttpScoringGateway::new(http_client, config.scoring_api_url.clone()));
    info!("Scoring service at {}", config.scoring_api_url);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState { gateway, config: config.clone() });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        HostError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 4. Create the Web Router ---
    let app = router(app_state).layer(cors);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
