use std::sync::Arc;

use tracing::debug;

use latchkey_domain::id::AttemptId;

use crate::domain::repository::{LoginAttemptStore, UserRepository};
use crate::domain::types::AuthUser;
use crate::error::{ConsumeError, GatewayError};

pub struct VerifyCodeInput {
    pub attempt_id: String,
    pub code: String,
}

pub struct VerifyCodeUseCase {
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub users: Arc<dyn UserRepository>,
}

impl VerifyCodeUseCase {
    /// Consume the attempt and resolve the user it was issued for.
    ///
    /// Every credential failure surfaces as `InvalidOrExpired`; only store
    /// trouble is reported as something else.
    pub async fn execute(&self, input: VerifyCodeInput) -> Result<AuthUser, GatewayError> {
        let Ok(attempt_id) = input.attempt_id.parse::<AttemptId>() else {
            debug!("verify rejected: malformed attempt id");
            return Err(GatewayError::InvalidOrExpired);
        };

        let email = match self.attempts.try_consume(attempt_id, &input.code).await {
            Ok(email) => email,
            Err(ConsumeError::Store(e)) => return Err(e.into()),
            Err(reason) => {
                debug!(%attempt_id, %reason, "verify rejected");
                return Err(reason.into());
            }
        };

        // The attempt is spent from here on. A store failure below leaves the
        // user to request a fresh link.
        let user = self.users.find_or_create_by_email(&email).await?;
        debug!(%attempt_id, user_id = %user.id, "login attempt consumed");

        Ok(user)
    }
}
