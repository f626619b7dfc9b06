//! Route definitions for the Crag Weather Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Discovery
        .route("/find-crags", post(handlers::find_crags))
        // Subscriptions
        .route("/subscribe", post(handlers::subscribe))
        // On-demand alert scan
        .route("/check-weather", get(handlers::check_weather))
}
