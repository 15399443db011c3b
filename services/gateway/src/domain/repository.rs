//! Ports the gateway core depends on. Infra provides Postgres and in-memory
//! implementations; `AppState` picks one at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::{AttemptId, SessionId};

use crate::domain::types::{AuthUser, LinkMessage, LoginAttempt, Session};
use crate::error::{ConsumeError, StoreError};

/// Code store: login attempts keyed by attempt id.
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    async fn put(&self, attempt: &LoginAttempt) -> Result<(), StoreError>;

    /// Store the attempt together with its link message.
    ///
    /// Stores that own a delivery outbox write both in one transaction and
    /// return `true`: the link is queued, or nothing is stored at all. The
    /// default just calls [`put`](Self::put) and returns `false`, leaving
    /// delivery to the [`LinkDelivery`] collaborator.
    async fn put_with_outbox(
        &self,
        attempt: &LoginAttempt,
        _message: &LinkMessage,
    ) -> Result<bool, StoreError> {
        self.put(attempt).await?;
        Ok(false)
    }

    async fn get(&self, id: AttemptId) -> Result<Option<LoginAttempt>, StoreError>;

    /// Atomically consume an attempt and return the email it was issued for.
    ///
    /// Runs [`LoginAttempt::check_consumable`] and then sets `consumed_at`
    /// under a compare-and-set on `consumed_at IS NULL`. Of any number of
    /// concurrent callers with the right code, exactly one gets `Ok`; the
    /// rest get `AlreadyConsumed`.
    async fn try_consume(&self, id: AttemptId, code: &str) -> Result<EmailAddress, ConsumeError>;

    /// Count unconsumed, unexpired attempts for an email.
    async fn count_active(&self, email: &EmailAddress) -> Result<u64, StoreError>;

    /// Delete attempts whose `expires_at` is before `now`. Returns rows removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Cheap round-trip used by the readiness check.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Identity store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up the user for `email`, creating one on first sight. Concurrent
    /// first logins for the same email converge on a single user.
    async fn find_or_create_by_email(&self, email: &EmailAddress) -> Result<AuthUser, StoreError>;
}

/// Session store.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), StoreError>;

    async fn find(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Set `revoked_at` if not already set. Returns `true` if this call revoked it.
    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Delete sessions that expired before `now` or were revoked.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Link delivery for stores without a transactional outbox.
///
/// Failures are reported to the caller but never affect the attempt.
#[async_trait]
pub trait LinkDelivery: Send + Sync {
    async fn deliver(&self, message: &LinkMessage) -> anyhow::Result<()>;
}
