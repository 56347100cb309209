//! Read-only operational endpoints: liveness, plugin help and counters.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use crate::plugins::PluginHelp;

/// Liveness probe. Returns 200 with the text "OK".
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Describes every registered plugin and its commands.
pub async fn plugin_help_handler(State(app_state): State<AppState>) -> Json<Vec<PluginHelp>> {
    Json(app_state.router().registry().help())
}

/// Text dump of the in-process counters.
pub async fn metrics_handler(State(app_state): State<AppState>) -> (StatusCode, String) {
    (StatusCode::OK, app_state.router().metrics().render())
}
