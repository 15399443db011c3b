use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use latchkey_domain::email::EmailAddress;
use latchkey_domain::id::{AttemptId, SessionId, UserId};
use latchkey_gateway_schema::{login_attempts, outbox_events, sessions, users};

use crate::domain::repository::{LoginAttemptStore, SessionRepository, UserRepository};
use crate::domain::types::{AuthUser, LOGIN_LINK_CREATED, LinkMessage, LoginAttempt, Session};
use crate::error::{ConsumeError, StoreError, StoreResultExt};

// ── Login attempts ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLoginAttemptStore {
    pub db: DatabaseConnection,
}

#[async_trait]
impl LoginAttemptStore for DbLoginAttemptStore {
    async fn put(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        insert_attempt(&self.db, attempt)
            .await
            .store_context("insert login attempt")
    }

    async fn put_with_outbox(
        &self,
        attempt: &LoginAttempt,
        message: &LinkMessage,
    ) -> Result<bool, StoreError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let attempt = attempt.clone();
                let message = message.clone();
                Box::pin(async move {
                    insert_attempt(txn, &attempt).await?;
                    insert_outbox_event(txn, &message).await?;
                    Ok(())
                })
            })
            .await
            .store_context("insert login attempt with outbox")?;
        Ok(true)
    }

    async fn get(&self, id: AttemptId) -> Result<Option<LoginAttempt>, StoreError> {
        let model = login_attempts::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .store_context("find login attempt")?;
        model.map(attempt_from_model).transpose()
    }

    async fn try_consume(&self, id: AttemptId, code: &str) -> Result<EmailAddress, ConsumeError> {
        let now = Utc::now();
        let attempt = self.get(id).await?.ok_or(ConsumeError::NotFound)?;
        attempt.check_consumable(code, now)?;

        // Compare-and-set: only the caller that flips consumed_at from NULL wins.
        let result = login_attempts::Entity::update_many()
            .col_expr(login_attempts::Column::ConsumedAt, Expr::value(now))
            .filter(login_attempts::Column::Id.eq(id.0))
            .filter(login_attempts::Column::ConsumedAt.is_null())
            .filter(login_attempts::Column::ExpiresAt.gte(now))
            .exec(&self.db)
            .await
            .store_context("consume login attempt")?;
        if result.rows_affected == 0 {
            // Lost a race, or the TTL ran out after the check above.
            let reason = match self.get(id).await? {
                None => ConsumeError::NotFound,
                Some(current) if current.consumed_at.is_none() => ConsumeError::Expired,
                Some(_) => ConsumeError::AlreadyConsumed,
            };
            return Err(reason);
        }
        Ok(attempt.email)
    }

    async fn count_active(&self, email: &EmailAddress) -> Result<u64, StoreError> {
        let now = Utc::now();
        login_attempts::Entity::find()
            .filter(login_attempts::Column::Email.eq(email.as_str()))
            .filter(login_attempts::Column::ConsumedAt.is_null())
            .filter(login_attempts::Column::ExpiresAt.gte(now))
            .count(&self.db)
            .await
            .store_context("count active login attempts")
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = login_attempts::Entity::delete_many()
            .filter(login_attempts::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .store_context("purge expired login attempts")?;
        Ok(result.rows_affected)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.ping().await.store_context("ping database")
    }
}

async fn insert_attempt<C: ConnectionTrait>(
    db: &C,
    attempt: &LoginAttempt,
) -> Result<(), sea_orm::DbErr> {
    let model = login_attempts::ActiveModel {
        id: Set(attempt.id.0),
        email: Set(attempt.email.as_str().to_owned()),
        code_hash: Set(attempt.code_hash.clone()),
        created_at: Set(attempt.created_at),
        expires_at: Set(attempt.expires_at),
        consumed_at: Set(attempt.consumed_at),
    };
    login_attempts::Entity::insert(model)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// One `login_link_created` row per attempt, drained by the mail worker.
async fn insert_outbox_event<C: ConnectionTrait>(
    db: &C,
    message: &LinkMessage,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    let payload = serde_json::json!({
        "email": message.email,
        "link": message.link,
    });
    let model = outbox_events::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(LOGIN_LINK_CREATED.to_owned()),
        payload: Set(payload),
        idempotency_key: Set(format!("{LOGIN_LINK_CREATED}:{}", message.attempt_id)),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    };
    outbox_events::Entity::insert(model)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

fn attempt_from_model(model: login_attempts::Model) -> Result<LoginAttempt, StoreError> {
    Ok(LoginAttempt {
        id: AttemptId(model.id),
        email: EmailAddress::try_from(model.email).store_context("stored attempt email")?,
        code_hash: model.code_hash,
        created_at: model.created_at,
        expires_at: model.expires_at,
        consumed_at: model.consumed_at,
    })
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_or_create_by_email(&self, email: &EmailAddress) -> Result<AuthUser, StoreError> {
        // Racing first logins both insert; the unique email index keeps one row.
        let insert = users::ActiveModel {
            id: Set(UserId::new_v4().0),
            email: Set(email.as_str().to_owned()),
            created_at: Set(Utc::now()),
        };
        users::Entity::insert(insert)
            .on_conflict(
                OnConflict::column(users::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .store_context("insert user")?;

        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await
            .store_context("find user by email")?
            .ok_or_else(|| StoreError::msg("user row missing after upsert"))?;

        Ok(AuthUser {
            id: UserId(model.id),
            email: email.clone(),
        })
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

#[async_trait]
impl SessionRepository for DbSessionRepository {
    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        sessions::ActiveModel {
            id: Set(session.id.0),
            user_id: Set(session.user_id.0),
            created_at: Set(session.created_at),
            expires_at: Set(session.expires_at),
            revoked_at: Set(session.revoked_at),
        }
        .insert(&self.db)
        .await
        .store_context("insert session")?;
        Ok(())
    }

    async fn find(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let model = sessions::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .store_context("find session")?;
        Ok(model.map(session_from_model))
    }

    async fn revoke(&self, id: SessionId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .filter(sessions::Column::Id.eq(id.0))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .store_context("revoke session")?;
        Ok(result.rows_affected > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sessions::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(sessions::Column::ExpiresAt.lt(now))
                    .add(sessions::Column::RevokedAt.is_not_null()),
            )
            .exec(&self.db)
            .await
            .store_context("purge dead sessions")?;
        Ok(result.rows_affected)
    }
}

fn session_from_model(model: sessions::Model) -> Session {
    Session {
        id: SessionId(model.id),
        user_id: UserId(model.user_id),
        created_at: model.created_at,
        expires_at: model.expires_at,
        revoked_at: model.revoked_at,
    }
}
