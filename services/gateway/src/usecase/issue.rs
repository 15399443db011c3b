use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use url::Url;

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::AttemptId;

use crate::config::GatewaySettings;
use crate::domain::code::generate_link_code;
use crate::domain::repository::{LinkDelivery, LoginAttemptStore};
use crate::domain::types::{LinkMessage, LoginAttempt};
use crate::error::GatewayError;

pub struct IssueCodeInput {
    pub email: String,
}

/// Result of issuing a login link. `code` and `link` are secrets: hand them to
/// delivery (or, in dev mode, the response) and nowhere else.
#[derive(Debug)]
pub struct IssueCodeOutput {
    pub attempt_id: AttemptId,
    pub code: String,
    pub link: Url,
    pub expires_at: DateTime<Utc>,
}

pub struct IssueCodeUseCase {
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub delivery: Arc<dyn LinkDelivery>,
    pub settings: Arc<GatewaySettings>,
}

impl IssueCodeUseCase {
    pub async fn execute(&self, input: IssueCodeInput) -> Result<IssueCodeOutput, GatewayError> {
        let email = EmailAddress::parse(&input.email).map_err(|_| GatewayError::InvalidEmail)?;

        let active = self.attempts.count_active(&email).await?;
        if active >= self.settings.max_active_attempts {
            info!(active, "login attempt limit reached");
            return Err(GatewayError::TooManyAttempts);
        }

        let code = generate_link_code();
        let attempt = LoginAttempt::new(email, &code, Utc::now(), self.settings.attempt_ttl);
        let link = build_verify_link(&self.settings.public_base_url, attempt.id, &code)?;
        let message = LinkMessage {
            attempt_id: attempt.id,
            email: attempt.email.clone(),
            link: link.to_string(),
        };

        let queued = self.attempts.put_with_outbox(&attempt, &message).await?;
        if !queued {
            if let Err(e) = self.delivery.deliver(&message).await {
                // The attempt stays valid; the client can ask for another link.
                warn!(attempt_id = %attempt.id, error = ?e, "login link delivery failed");
            }
        }

        info!(
            attempt_id = %attempt.id,
            email = %attempt.email,
            expires_at = %attempt.expires_at,
            "login attempt issued"
        );

        Ok(IssueCodeOutput {
            attempt_id: attempt.id,
            code,
            link,
            expires_at: attempt.expires_at,
        })
    }
}

/// `{base}/auth/verify?attempt_id=…&code=…`, keeping any path prefix on `base`.
pub fn build_verify_link(base: &Url, attempt_id: AttemptId, code: &str) -> anyhow::Result<Url> {
    let mut link = base.clone();
    link.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("public base url cannot be a base"))?
        .pop_if_empty()
        .extend(["auth", "verify"]);
    link.query_pairs_mut()
        .clear()
        .append_pair("attempt_id", &attempt_id.to_string())
        .append_pair("code", code);
    link.set_fragment(None);
    Ok(link)
}
