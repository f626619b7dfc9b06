//! HTTP handler for the on-demand weather check

use axum::extract::State;

use crate::error::AppResult;
use crate::AppState;

/// Run one scan pass and report the totals as plain text. Shares the
/// single-flight guard with the recurring task.
pub async fn check_weather(State(state): State<AppState>) -> AppResult<String> {
    match state.scanner.run_exclusive().await? {
        Some(report) => Ok(format!("{}\n", report)),
        None => Ok("A scan pass is already running.\n".to_string()),
    }
}
