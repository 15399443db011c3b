use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use latchkey_domain::id::{SessionId, UserId};
use latchkey_session_types::cookie::set_session_cookie;

use crate::error::GatewayError;
use crate::state::AppState;
use crate::usecase::verify::VerifyCodeInput;

/// Both fields default to empty so a link with a missing parameter is
/// rejected as `InvalidOrExpired`, not with an extractor error.
#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub attempt_id: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub user_id: UserId,
    pub session_id: SessionId,
    #[serde(serialize_with = "latchkey_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn verify_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<VerifyQuery>,
) -> Result<(CookieJar, Json<VerifyResponse>), GatewayError> {
    let user = state
        .verify_code_usecase()
        .execute(VerifyCodeInput {
            attempt_id: query.attempt_id,
            code: query.code,
        })
        .await?;

    let session = state.session_manager().create_session(user.id).await?;

    let jar = set_session_cookie(
        jar,
        session.token,
        state.settings.session_ttl.num_seconds(),
        &state.settings.cookie,
    );
    let body = VerifyResponse {
        user_id: user.id,
        session_id: session.session_id,
        expires_at: session.expires_at,
    };
    Ok((jar, Json(body)))
}
