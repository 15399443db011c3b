use std::sync::Arc;

use chrono::{Duration, Utc};

use latchkey_domain::id::{SessionId, UserId};
use latchkey_gateway::domain::repository::{LoginAttemptStore, SessionRepository};
use latchkey_gateway::domain::types::{LoginAttempt, Session};
use latchkey_gateway::error::GatewayError;
use latchkey_gateway::usecase::reaper::{ReapReport, Reaper};
use latchkey_session_types::token::{SessionTokenInfo, encode_session_token};

use crate::helpers::{Fixture, TEST_SECRET, email, expired_attempt};

fn far_future_exp() -> u64 {
    (Utc::now() + Duration::days(1)).timestamp() as u64
}

#[tokio::test]
async fn should_resolve_created_session_to_same_user_every_time() {
    let fx = Fixture::new();
    let user_id = UserId::new_v4();

    let created = fx.sessions().create_session(user_id).await.unwrap();
    let row = fx.sessions.find(created.session_id).await.unwrap().unwrap();
    assert_eq!(row.expires_at, created.expires_at);
    assert_eq!(row.user_id, user_id);

    for _ in 0..3 {
        let resolved = fx.sessions().resolve(&created.token).await.unwrap();
        assert_eq!(resolved.user_id, user_id);
        assert_eq!(resolved.session_id, created.session_id);
    }
}

#[tokio::test]
async fn should_reject_random_token() {
    let fx = Fixture::new();
    fx.sessions().create_session(UserId::new_v4()).await.unwrap();

    for token in ["", "garbage", "a.b.c"] {
        let result = fx.sessions().resolve(token).await;
        assert!(
            matches!(result, Err(GatewayError::Unauthenticated)),
            "expected Unauthenticated for {token:?}, got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_reject_token_signed_with_another_secret() {
    let fx = Fixture::new();
    let created = fx.sessions().create_session(UserId::new_v4()).await.unwrap();
    let row = fx.sessions.find(created.session_id).await.unwrap().unwrap();

    let forged = encode_session_token(
        &SessionTokenInfo {
            user_id: row.user_id,
            session_id: row.id,
            exp: far_future_exp(),
        },
        "some-other-secret-of-sufficient-length!!",
    )
    .unwrap();

    let result = fx.sessions().resolve(&forged).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
}

#[tokio::test]
async fn should_reject_well_signed_token_without_session_row() {
    let fx = Fixture::new();
    let token = encode_session_token(
        &SessionTokenInfo {
            user_id: UserId::new_v4(),
            session_id: SessionId::new_v4(),
            exp: far_future_exp(),
        },
        TEST_SECRET,
    )
    .unwrap();

    let result = fx.sessions().resolve(&token).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
}

#[tokio::test]
async fn should_reject_token_whose_subject_disagrees_with_session() {
    let fx = Fixture::new();
    let created = fx.sessions().create_session(UserId::new_v4()).await.unwrap();

    let token = encode_session_token(
        &SessionTokenInfo {
            user_id: UserId::new_v4(),
            session_id: created.session_id,
            exp: far_future_exp(),
        },
        TEST_SECRET,
    )
    .unwrap();

    let result = fx.sessions().resolve(&token).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
}

#[tokio::test]
async fn should_reject_session_past_its_expiry() {
    let fx = Fixture::new();
    let user_id = UserId::new_v4();
    let session = Session::new(user_id, Utc::now() - Duration::hours(3), Duration::hours(1));
    fx.sessions.create(&session).await.unwrap();

    // Token itself still carries a future `exp`; the row decides.
    let token = encode_session_token(
        &SessionTokenInfo {
            user_id,
            session_id: session.id,
            exp: far_future_exp(),
        },
        TEST_SECRET,
    )
    .unwrap();

    let result = fx.sessions().resolve(&token).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
}

#[tokio::test]
async fn should_reject_token_after_revocation() {
    let fx = Fixture::new();
    let created = fx.sessions().create_session(UserId::new_v4()).await.unwrap();

    fx.sessions().revoke(&created.token).await.unwrap();

    let result = fx.sessions().resolve(&created.token).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
    let again = fx.sessions().revoke(&created.token).await;
    assert!(matches!(again, Err(GatewayError::Unauthenticated)));
}

#[tokio::test]
async fn should_keep_other_sessions_when_one_is_revoked() {
    let fx = Fixture::new();
    let user_id = UserId::new_v4();
    let phone = fx.sessions().create_session(user_id).await.unwrap();
    let laptop = fx.sessions().create_session(user_id).await.unwrap();

    fx.sessions().revoke(&phone.token).await.unwrap();

    let resolved = fx.sessions().resolve(&laptop.token).await.unwrap();
    assert_eq!(resolved.session_id, laptop.session_id);
}

#[tokio::test]
async fn should_reap_expired_attempts_and_dead_sessions() {
    let fx = Fixture::new();
    let now = Utc::now();

    let stale = expired_attempt(email("alice@example.com"), "old");
    let live = LoginAttempt::new(email("alice@example.com"), "new", now, Duration::minutes(15));
    fx.attempts.put(&stale).await.unwrap();
    fx.attempts.put(&live).await.unwrap();

    let expired = Session::new(UserId::new_v4(), now - Duration::hours(3), Duration::hours(1));
    fx.sessions.create(&expired).await.unwrap();
    let revoked = fx.sessions().create_session(UserId::new_v4()).await.unwrap();
    fx.sessions().revoke(&revoked.token).await.unwrap();
    let active = fx.sessions().create_session(UserId::new_v4()).await.unwrap();

    let reaper = Reaper {
        attempts: Arc::new(fx.attempts.clone()),
        sessions: Arc::new(fx.sessions.clone()),
    };
    let report = reaper.run_once(Utc::now()).await.unwrap();

    assert_eq!(
        report,
        ReapReport {
            attempts: 1,
            sessions: 2
        }
    );
    assert!(fx.attempts.get(live.id).await.unwrap().is_some());
    fx.sessions().resolve(&active.token).await.unwrap();

    let second = reaper.run_once(Utc::now()).await.unwrap();
    assert_eq!(second, ReapReport::default());
}
