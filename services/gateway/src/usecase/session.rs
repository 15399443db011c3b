use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use latchkey_domain::id::{SessionId, UserId};
use latchkey_session_types::token::{SessionTokenInfo, decode_session_token, encode_session_token};

use crate::config::GatewaySettings;
use crate::domain::repository::SessionRepository;
use crate::domain::types::Session;
use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub expires_at: DateTime<Utc>,
}

/// Issues, resolves and revokes sessions.
///
/// The signed token carries the session id; the row is the source of truth
/// for revocation.
pub struct SessionManager {
    pub sessions: Arc<dyn SessionRepository>,
    pub settings: Arc<GatewaySettings>,
}

impl SessionManager {
    pub async fn create_session(&self, user_id: UserId) -> Result<CreatedSession, GatewayError> {
        let session = Session::new(user_id, Utc::now(), self.settings.session_ttl);
        self.sessions.create(&session).await?;

        let info = SessionTokenInfo {
            user_id,
            session_id: session.id,
            exp: u64::try_from(session.expires_at.timestamp()).unwrap_or(0),
        };
        let token = encode_session_token(&info, &self.settings.jwt_secret)
            .context("sign session token")?;

        info!(session_id = %session.id, %user_id, "session created");

        Ok(CreatedSession {
            session_id: session.id,
            token,
            expires_at: session.expires_at,
        })
    }

    pub async fn resolve(&self, token: &str) -> Result<ResolvedSession, GatewayError> {
        let info = decode_session_token(token, &self.settings.jwt_secret).map_err(|e| {
            debug!(error = %e, "session token rejected");
            GatewayError::Unauthenticated
        })?;

        let Some(session) = self.sessions.find(info.session_id).await? else {
            debug!(session_id = %info.session_id, "session not found");
            return Err(GatewayError::Unauthenticated);
        };
        if session.user_id != info.user_id || !session.is_active_at(Utc::now()) {
            debug!(session_id = %session.id, "session inactive");
            return Err(GatewayError::Unauthenticated);
        }

        Ok(ResolvedSession {
            user_id: session.user_id,
            session_id: session.id,
            expires_at: session.expires_at,
        })
    }

    /// Revoke the session behind `token`. Idempotent for a token that
    /// resolved once; an unknown or already dead token is `Unauthenticated`.
    pub async fn revoke(&self, token: &str) -> Result<(), GatewayError> {
        let resolved = self.resolve(token).await?;
        if self.sessions.revoke(resolved.session_id, Utc::now()).await? {
            info!(session_id = %resolved.session_id, "session revoked");
        }
        Ok(())
    }
}
