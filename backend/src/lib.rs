//! Crag Weather Platform - Backend
//!
//! Finds outdoor climbing crags reachable within a travel-time budget from
//! an origin city, filters them by weather forecast, and emails subscribers
//! when the forecast for a chosen crag and date changes.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

use external::mail::MailerClient;
use external::weather::WeatherClient;
use services::catalog::CatalogStore;
use services::scanner::AlertScanner;

/// Application state shared across handlers
///
/// All external clients are constructed once at startup from the loaded
/// configuration; no module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub weather: WeatherClient,
    pub mailer: MailerClient,
    pub catalog: CatalogStore,
    pub scanner: Arc<AlertScanner>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Crag Weather Platform API v1.0"
}
