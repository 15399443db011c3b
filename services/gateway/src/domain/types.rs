use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::{AttemptId, SessionId, UserId};

use crate::domain::code::{code_matches, hash_code};
use crate::error::ConsumeError;

/// Identity record resolved from an email on successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: EmailAddress,
}

/// One issued magic link.
///
/// `consumed_at` moves from `None` to a timestamp at most once; after that, or
/// after `expires_at`, the attempt is terminal.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub id: AttemptId,
    pub email: EmailAddress,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl LoginAttempt {
    pub fn new(email: EmailAddress, code: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: AttemptId::new_v4(),
            email,
            code_hash: hash_code(code),
            created_at: now,
            expires_at: expiry(now, ttl),
            consumed_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Unconsumed and unexpired; counts against the per-email issuance limit.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && !self.is_expired_at(now)
    }

    /// Every check `try_consume` makes before it sets `consumed_at`.
    ///
    /// Order matters: expiry wins over everything, so an expired attempt
    /// reports `Expired` whether or not the code is right.
    pub fn check_consumable(&self, code: &str, now: DateTime<Utc>) -> Result<(), ConsumeError> {
        if self.is_expired_at(now) {
            return Err(ConsumeError::Expired);
        }
        if self.consumed_at.is_some() {
            return Err(ConsumeError::AlreadyConsumed);
        }
        if !code_matches(&self.code_hash, code) {
            return Err(ConsumeError::CodeMismatch);
        }
        Ok(())
    }
}

/// Server-side session row. The transport token points at it by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: SessionId::new_v4(),
            user_id,
            created_at: now,
            expires_at: expiry(now, ttl),
            revoked_at: None,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now <= self.expires_at
    }
}

/// `now + ttl`, pinned to the latest representable instant on overflow.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// What the delivery collaborator receives for one issued link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkMessage {
    pub attempt_id: AttemptId,
    pub email: EmailAddress,
    pub link: String,
}

/// Outbox event kind written for every issued link.
pub const LOGIN_LINK_CREATED: &str = "login_link_created";
