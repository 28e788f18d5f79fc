mod config;
mod handler;
mod service;

use axum::{
    routing::{get, post},
    Router,
};
use common::models::Profile;
use config::ApiConfig;
use connectors::{
    BittrexConnector, CoinDeskRates, ExchangeConnector, NetworkDataProvider, NiceHashProvider, PoloniexConnector,
    WhatToMineProvider,
};
use service::ProfitService;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting hashyield API");

    let config = ApiConfig::from_env();
    let profile = Profile::load(&config.profile_path)
        .map_err(|e| format!("Failed to load profile: {}", e))?;
    info!(
        "Using profile '{}' with {} algorithms",
        profile.name,
        profile.algorithms.len()
    );

    let providers: Vec<Arc<dyn NetworkDataProvider>> = vec![
        Arc::new(WhatToMineProvider::new()),
        Arc::new(NiceHashProvider::new()),
    ];
    let exchanges: Vec<Arc<dyn ExchangeConnector>> = vec![
        Arc::new(BittrexConnector::new()),
        Arc::new(PoloniexConnector::new()),
    ];

    let service = ProfitService::new(profile, providers, exchanges, Some(Arc::new(CoinDeskRates::new())));
    let service = Arc::new(RwLock::new(service));

    if config.refresh_on_start {
        let refreshed = service.read().await.refresh().await;
        match refreshed {
            Ok(refreshed) => {
                service.write().await.install(refreshed);
            }
            Err(e) => warn!("Initial refresh failed: {}", e),
        }
    }

    // Create CORS middleware
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route(
            "/api/v1/refresh",
            post(handler::refresh).get(handler::last_refresh),
        )
        .route("/api/v1/coins", get(handler::list_coins))
        .route("/api/v1/coins/:tag", get(handler::get_coin))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service);

    // Start server
    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
