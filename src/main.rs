// LedCast API v0.1
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod assembler;
mod classifier;
mod colormap;
mod config;
mod errors;
mod geofence;
mod grid;
mod orchestrator;
mod routes;
mod segment_spec;
mod services;
mod timeseries;

use config::AppConfig;
use routes::leds::AppState;
use services::cache_store::CacheStore;
use services::coordinator::FetchCoordinator;
use services::upstream::UpstreamClient;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let upstream = UpstreamClient::new(&config.user_agent);
    let cache = CacheStore::new(config.data_dir.clone(), config.save_history);
    let coordinator = FetchCoordinator::new(cache, upstream);

    // Build shared application state
    let app_state = AppState {
        coordinator: Arc::new(coordinator),
        colormap: Arc::new(colormap::Colormap::plain()),
    };

    // CORS — read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let health_routes = Router::new().route("/api/v1/health", get(routes::health::health_check));

    let leds_routes = Router::new()
        .route("/api/v1/leds", get(routes::leds::get_leds))
        .with_state(app_state);

    let app = Router::new()
        .merge(health_routes)
        .merge(leds_routes)
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
