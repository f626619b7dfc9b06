//! HTTP handler for crag discovery

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::discovery::{CragMatch, DiscoveryService, FindCragsRequest};
use crate::AppState;

/// Find crags within a travel-time budget, annotated with forecasts
pub async fn find_crags(
    State(state): State<AppState>,
    Json(request): Json<FindCragsRequest>,
) -> AppResult<Json<Vec<CragMatch>>> {
    let service = DiscoveryService::new(state.catalog.clone(), state.weather.clone());
    let matches = service.find(request).await?;
    Ok(Json(matches))
}
