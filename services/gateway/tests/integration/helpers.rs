use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use url::Url;

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::AttemptId;
use latchkey_gateway::config::GatewaySettings;
use latchkey_gateway::domain::repository::{LinkDelivery, LoginAttemptStore, UserRepository};
use latchkey_gateway::domain::types::{AuthUser, LinkMessage, LoginAttempt};
use latchkey_gateway::error::{ConsumeError, StoreError};
use latchkey_gateway::infra::memory::{
    MemoryLoginAttemptStore, MemorySessionRepository, MemoryUserRepository,
};
use latchkey_gateway::state::AppState;
use latchkey_gateway::usecase::issue::IssueCodeUseCase;
use latchkey_gateway::usecase::session::SessionManager;
use latchkey_gateway::usecase::verify::VerifyCodeUseCase;
use latchkey_session_types::cookie::CookieSettings;

pub const TEST_SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

pub fn test_settings() -> GatewaySettings {
    GatewaySettings {
        attempt_ttl: Duration::minutes(15),
        session_ttl: Duration::hours(1),
        max_active_attempts: 3,
        public_base_url: Url::parse("https://login.example.com").unwrap(),
        jwt_secret: TEST_SECRET.to_owned(),
        cookie: CookieSettings {
            domain: None,
            secure: false,
        },
        expose_link: true,
    }
}

pub fn email(raw: &str) -> EmailAddress {
    EmailAddress::parse(raw).unwrap()
}

/// Pull `(attempt_id, code)` back out of an issued link.
pub fn link_params(link: &Url) -> (String, String) {
    let mut attempt_id = None;
    let mut code = None;
    for (k, v) in link.query_pairs() {
        match k.as_ref() {
            "attempt_id" => attempt_id = Some(v.into_owned()),
            "code" => code = Some(v.into_owned()),
            _ => {}
        }
    }
    (attempt_id.unwrap(), code.unwrap())
}

/// An attempt whose TTL ran out an hour ago.
pub fn expired_attempt(email: EmailAddress, code: &str) -> LoginAttempt {
    let issued: DateTime<Utc> = Utc::now() - Duration::hours(2);
    LoginAttempt::new(email, code, issued, Duration::hours(1))
}

// ── In-memory fixture ────────────────────────────────────────────────────────

/// In-memory stores with handles kept for post-execution inspection.
pub struct Fixture {
    pub attempts: MemoryLoginAttemptStore,
    pub users: MemoryUserRepository,
    pub sessions: MemorySessionRepository,
    pub outbox: MemoryOutbox,
    pub settings: Arc<GatewaySettings>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: GatewaySettings) -> Self {
        Self {
            attempts: MemoryLoginAttemptStore::new(),
            users: MemoryUserRepository::new(),
            sessions: MemorySessionRepository::new(),
            outbox: MemoryOutbox::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn issue(&self) -> IssueCodeUseCase {
        IssueCodeUseCase {
            attempts: Arc::new(self.attempts.clone()),
            delivery: Arc::new(self.outbox.clone()),
            settings: self.settings.clone(),
        }
    }

    pub fn verify(&self) -> VerifyCodeUseCase {
        VerifyCodeUseCase {
            attempts: Arc::new(self.attempts.clone()),
            users: Arc::new(self.users.clone()),
        }
    }

    pub fn sessions(&self) -> SessionManager {
        SessionManager {
            sessions: Arc::new(self.sessions.clone()),
            settings: self.settings.clone(),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            attempts: Arc::new(self.attempts.clone()),
            users: Arc::new(self.users.clone()),
            sessions: Arc::new(self.sessions.clone()),
            delivery: Arc::new(self.outbox.clone()),
            settings: self.settings.clone(),
        }
    }
}

// ── Recording delivery ───────────────────────────────────────────────────────

/// Delivery that keeps every message so tests can read the link back.
#[derive(Clone, Default)]
pub struct MemoryOutbox {
    messages: Arc<Mutex<Vec<LinkMessage>>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LinkMessage> {
        self.messages.lock().clone()
    }

    pub fn last_link_for(&self, email: &EmailAddress) -> Option<String> {
        self.messages
            .lock()
            .iter()
            .rev()
            .find(|m| &m.email == email)
            .map(|m| m.link.clone())
    }
}

#[async_trait]
impl LinkDelivery for MemoryOutbox {
    async fn deliver(&self, message: &LinkMessage) -> anyhow::Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

// ── Failing ports ────────────────────────────────────────────────────────────

/// Code store whose backend is down.
pub struct UnavailableAttemptStore;

#[async_trait]
impl LoginAttemptStore for UnavailableAttemptStore {
    async fn put(&self, _attempt: &LoginAttempt) -> Result<(), StoreError> {
        Err(StoreError::msg("connection refused"))
    }

    async fn get(&self, _id: AttemptId) -> Result<Option<LoginAttempt>, StoreError> {
        Err(StoreError::msg("connection refused"))
    }

    async fn try_consume(
        &self,
        _id: AttemptId,
        _code: &str,
    ) -> Result<EmailAddress, ConsumeError> {
        Err(StoreError::msg("connection refused").into())
    }

    async fn count_active(&self, _email: &EmailAddress) -> Result<u64, StoreError> {
        Err(StoreError::msg("connection refused"))
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::msg("connection refused"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::msg("connection refused"))
    }
}

/// Identity store whose backend is down.
pub struct UnavailableUserRepository;

#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn find_or_create_by_email(&self, _email: &EmailAddress) -> Result<AuthUser, StoreError> {
        Err(StoreError::msg("connection refused"))
    }
}

/// Mail relay that rejects everything.
pub struct FailingDelivery;

#[async_trait]
impl LinkDelivery for FailingDelivery {
    async fn deliver(&self, _message: &LinkMessage) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay rejected message")
    }
}

/// Code store whose backend accepts connections and never answers.
pub struct StalledAttemptStore;

#[async_trait]
impl LoginAttemptStore for StalledAttemptStore {
    async fn put(&self, _attempt: &LoginAttempt) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn get(&self, _id: AttemptId) -> Result<Option<LoginAttempt>, StoreError> {
        std::future::pending().await
    }

    async fn try_consume(
        &self,
        _id: AttemptId,
        _code: &str,
    ) -> Result<EmailAddress, ConsumeError> {
        std::future::pending().await
    }

    async fn count_active(&self, _email: &EmailAddress) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        std::future::pending().await
    }
}
