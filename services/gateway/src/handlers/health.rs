use axum::{extract::State, http::StatusCode};
use tracing::warn;

use latchkey_core::health::readiness_status;

use crate::state::AppState;

/// `GET /readyz`: ready when the code store answers.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    let ready = match state.attempts.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = ?e, "readiness check failed");
            false
        }
    };
    readiness_status(ready)
}
