use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;

use latchkey_domain::id::{SessionId, UserId};
use latchkey_session_types::cookie::clear_session_cookie;
use latchkey_session_types::transport::SessionToken;

use crate::error::GatewayError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub session_id: SessionId,
    #[serde(serialize_with = "latchkey_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

// ── GET /auth/session ─────────────────────────────────────────────────────────

pub async fn get_session(
    State(state): State<AppState>,
    token: SessionToken,
) -> Result<Json<SessionResponse>, GatewayError> {
    let session = state.session_manager().resolve(token.as_str()).await?;
    Ok(Json(SessionResponse {
        user_id: session.user_id,
        session_id: session.session_id,
        expires_at: session.expires_at,
    }))
}

// ── DELETE /auth/session ──────────────────────────────────────────────────────

pub async fn delete_session(
    State(state): State<AppState>,
    jar: CookieJar,
    token: SessionToken,
) -> Result<(CookieJar, StatusCode), GatewayError> {
    state.session_manager().revoke(token.as_str()).await?;
    let jar = clear_session_cookie(jar, &state.settings.cookie);
    Ok((jar, StatusCode::NO_CONTENT))
}
