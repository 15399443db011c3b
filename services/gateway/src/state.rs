use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::GatewaySettings;
use crate::domain::repository::{
    LinkDelivery, LoginAttemptStore, SessionRepository, UserRepository,
};
use crate::infra::db::{DbLoginAttemptStore, DbSessionRepository, DbUserRepository};
use crate::infra::delivery::LogLinkDelivery;
use crate::infra::memory::{
    MemoryLoginAttemptStore, MemorySessionRepository, MemoryUserRepository,
};
use crate::usecase::issue::IssueCodeUseCase;
use crate::usecase::reaper::Reaper;
use crate::usecase::session::SessionManager;
use crate::usecase::verify::VerifyCodeUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub delivery: Arc<dyn LinkDelivery>,
    pub settings: Arc<GatewaySettings>,
}

impl AppState {
    /// Links reach users through the `outbox_events` rows written alongside
    /// each attempt; `delivery` only sees messages the store did not queue.
    pub fn postgres(db: DatabaseConnection, settings: GatewaySettings) -> Self {
        Self {
            attempts: Arc::new(DbLoginAttemptStore { db: db.clone() }),
            users: Arc::new(DbUserRepository { db: db.clone() }),
            sessions: Arc::new(DbSessionRepository { db }),
            delivery: Arc::new(LogLinkDelivery),
            settings: Arc::new(settings),
        }
    }

    pub fn in_memory(settings: GatewaySettings, delivery: Arc<dyn LinkDelivery>) -> Self {
        Self {
            attempts: Arc::new(MemoryLoginAttemptStore::new()),
            users: Arc::new(MemoryUserRepository::new()),
            sessions: Arc::new(MemorySessionRepository::new()),
            delivery,
            settings: Arc::new(settings),
        }
    }

    pub fn issue_code_usecase(&self) -> IssueCodeUseCase {
        IssueCodeUseCase {
            attempts: self.attempts.clone(),
            delivery: self.delivery.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn verify_code_usecase(&self) -> VerifyCodeUseCase {
        VerifyCodeUseCase {
            attempts: self.attempts.clone(),
            users: self.users.clone(),
        }
    }

    pub fn session_manager(&self) -> SessionManager {
        SessionManager {
            sessions: self.sessions.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn reaper(&self) -> Reaper {
        Reaper {
            attempts: self.attempts.clone(),
            sessions: self.sessions.clone(),
        }
    }
}
