//! HTTP handler for crag weather subscriptions

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::services::subscription::{SelectedCrag, SubscriptionBatch, SubscriptionService};
use crate::AppState;

/// Subscribe request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub selected_crags: Vec<SelectedCrag>,
}

/// Subscribe response
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub batch: SubscriptionBatch,
}

/// Subscribe to forecast-change alerts for the selected crags.
///
/// The response reflects persistence only; a confirmation email that
/// fails to send is logged, not surfaced.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> AppResult<(StatusCode, Json<SubscribeResponse>)> {
    let service = SubscriptionService::new(state.db.clone());
    let batch = service
        .create_for_crags(
            &request.email,
            request.date_from,
            request.date_to,
            &request.selected_crags,
        )
        .await?;

    if batch.fully_saved() {
        let body = confirmation_body(request.date_from, request.date_to, &batch.saved);
        if let Err(e) = state
            .mailer
            .send("Climbing Crag Subscription Confirmed", &request.email, &body)
            .await
        {
            tracing::error!("Failed to send confirmation email to {}: {}", request.email, e);
        }

        Ok((
            StatusCode::OK,
            Json(SubscribeResponse {
                status: "success".to_string(),
                message: None,
                batch,
            }),
        ))
    } else {
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubscribeResponse {
                status: "error".to_string(),
                message: Some("Failed to save crags".to_string()),
                batch,
            }),
        ))
    }
}

/// Body of the subscription confirmation email
pub fn confirmation_body(date_from: NaiveDate, date_to: NaiveDate, crag_names: &[String]) -> String {
    format!(
        "Hi! You've successfully subscribed to receive updates for crags from {} to {}.\n\n\
         Selected Crags:\n{}",
        date_from,
        date_to,
        crag_names.join("\n")
    )
}
