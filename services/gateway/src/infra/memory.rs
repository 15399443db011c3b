//! Process-local stores for development and tests.
//!
//! Each store is a map behind one `parking_lot::Mutex`; every check-then-set
//! happens under a single lock acquisition.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::{AttemptId, SessionId, UserId};

use crate::domain::repository::{LoginAttemptStore, SessionRepository, UserRepository};
use crate::domain::types::{AuthUser, LoginAttempt, Session};
use crate::error::{ConsumeError, StoreError};

// ── Login attempts ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryLoginAttemptStore {
    attempts: Arc<Mutex<HashMap<AttemptId, LoginAttempt>>>,
}

impl MemoryLoginAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LoginAttemptStore for MemoryLoginAttemptStore {
    async fn put(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        self.attempts.lock().insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn get(&self, id: AttemptId) -> Result<Option<LoginAttempt>, StoreError> {
        Ok(self.attempts.lock().get(&id).cloned())
    }

    async fn try_consume(&self, id: AttemptId, code: &str) -> Result<EmailAddress, ConsumeError> {
        let now = Utc::now();
        let mut attempts = self.attempts.lock();
        let attempt = attempts.get_mut(&id).ok_or(ConsumeError::NotFound)?;
        attempt.check_consumable(code, now)?;
        attempt.consumed_at = Some(now);
        Ok(attempt.email.clone())
    }

    async fn count_active(&self, email: &EmailAddress) -> Result<u64, StoreError> {
        let now = Utc::now();
        let count = self
            .attempts
            .lock()
            .values()
            .filter(|a| &a.email == email && a.is_active_at(now))
            .count();
        Ok(count as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut attempts = self.attempts.lock();
        let before = attempts.len();
        attempts.retain(|_, a| a.expires_at >= now);
        Ok((before - attempts.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<HashMap<EmailAddress, UserId>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_or_create_by_email(&self, email: &EmailAddress) -> Result<AuthUser, StoreError> {
        let id = *self
            .users
            .lock()
            .entry(email.clone())
            .or_insert_with(UserId::new_v4);
        Ok(AuthUser {
            id,
            email: email.clone(),
        })
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.lock().insert(session.id, session.clone());
        Ok(())
    }

    async fn find(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.lock().get(&id).cloned())
    }

    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&id) {
            Some(session) if session.revoked_at.is_none() => {
                session.revoked_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.revoked_at.is_none() && s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}
