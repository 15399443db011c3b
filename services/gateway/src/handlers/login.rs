use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use latchkey_domain::id::AttemptId;

use crate::error::GatewayError;
use crate::state::AppState;
use crate::usecase::issue::IssueCodeInput;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub attempt_id: AttemptId,
    #[serde(serialize_with = "latchkey_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    /// Only present when `EXPOSE_LINK` is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

pub async fn create_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), GatewayError> {
    let output = state
        .issue_code_usecase()
        .execute(IssueCodeInput { email: body.email })
        .await?;

    let body = LoginResponse {
        attempt_id: output.attempt_id,
        expires_at: output.expires_at,
        link: state.settings.expose_link.then(|| output.link.to_string()),
    };
    Ok((StatusCode::CREATED, Json(body)))
}
