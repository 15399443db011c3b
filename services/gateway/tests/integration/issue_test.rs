use std::sync::Arc;

use latchkey_domain::id::AttemptId;
use latchkey_gateway::domain::repository::LoginAttemptStore;
use latchkey_gateway::error::GatewayError;
use latchkey_gateway::infra::memory::MemoryLoginAttemptStore;
use latchkey_gateway::usecase::issue::{IssueCodeInput, IssueCodeUseCase};

use crate::helpers::{
    FailingDelivery, Fixture, UnavailableAttemptStore, email, link_params, test_settings,
};

fn input(raw: &str) -> IssueCodeInput {
    IssueCodeInput {
        email: raw.to_owned(),
    }
}

#[tokio::test]
async fn should_store_attempt_and_deliver_link() {
    let fx = Fixture::new();

    let out = fx.issue().execute(input("alice@example.com")).await.unwrap();

    let stored = fx.attempts.get(out.attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.email, email("alice@example.com"));
    assert!(stored.consumed_at.is_none());
    assert_eq!(stored.expires_at, out.expires_at);
    assert_eq!(stored.expires_at - stored.created_at, fx.settings.attempt_ttl);
    assert_ne!(stored.code_hash, out.code, "raw code must not be stored");

    let messages = fx.outbox.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].attempt_id, out.attempt_id);
    assert_eq!(messages[0].link, out.link.to_string());
}

#[tokio::test]
async fn should_build_verify_link_from_public_base_url() {
    let fx = Fixture::new();

    let out = fx.issue().execute(input("alice@example.com")).await.unwrap();

    assert_eq!(out.link.host_str(), Some("login.example.com"));
    assert_eq!(out.link.path(), "/auth/verify");
    let (attempt_id, code) = link_params(&out.link);
    assert_eq!(attempt_id.parse::<AttemptId>().unwrap(), out.attempt_id);
    assert_eq!(code, out.code);
    assert_eq!(code.len(), 43);
}

#[tokio::test]
async fn should_normalize_email_before_storing() {
    let fx = Fixture::new();

    let out = fx
        .issue()
        .execute(input("  Alice@Example.COM "))
        .await
        .unwrap();

    let stored = fx.attempts.get(out.attempt_id).await.unwrap().unwrap();
    assert_eq!(stored.email.as_str(), "alice@example.com");
    assert!(fx.outbox.last_link_for(&email("alice@example.com")).is_some());
}

#[tokio::test]
async fn should_reject_malformed_email() {
    let fx = Fixture::new();

    for raw in ["", "not-an-email", "a@b", "two@@example.com"] {
        let result = fx.issue().execute(input(raw)).await;
        assert!(
            matches!(result, Err(GatewayError::InvalidEmail)),
            "expected InvalidEmail for {raw:?}, got {result:?}"
        );
    }
    assert!(fx.attempts.is_empty());
    assert!(fx.outbox.messages().is_empty());
}

#[tokio::test]
async fn should_issue_independent_attempts_for_same_email() {
    let fx = Fixture::new();

    let first = fx.issue().execute(input("alice@example.com")).await.unwrap();
    let second = fx.issue().execute(input("alice@example.com")).await.unwrap();

    assert_ne!(first.attempt_id, second.attempt_id);
    assert_ne!(first.code, second.code);
    assert_eq!(fx.attempts.len(), 2);
}

#[tokio::test]
async fn should_refuse_when_active_attempt_limit_reached() {
    let fx = Fixture::new();
    let limit = fx.settings.max_active_attempts;

    for _ in 0..limit {
        fx.issue().execute(input("alice@example.com")).await.unwrap();
    }
    let result = fx.issue().execute(input("alice@example.com")).await;

    assert!(
        matches!(result, Err(GatewayError::TooManyAttempts)),
        "expected TooManyAttempts, got {result:?}"
    );
    // Other addresses are unaffected.
    fx.issue().execute(input("bob@example.com")).await.unwrap();
}

#[tokio::test]
async fn should_free_limit_slot_once_attempt_is_consumed() {
    let fx = Fixture::new();
    let limit = fx.settings.max_active_attempts;

    let mut issued = Vec::new();
    for _ in 0..limit {
        issued.push(fx.issue().execute(input("alice@example.com")).await.unwrap());
    }
    let first = &issued[0];
    fx.attempts
        .try_consume(first.attempt_id, &first.code)
        .await
        .unwrap();

    fx.issue().execute(input("alice@example.com")).await.unwrap();
}

#[tokio::test]
async fn should_keep_attempt_when_delivery_fails() {
    let attempts = MemoryLoginAttemptStore::new();
    let uc = IssueCodeUseCase {
        attempts: Arc::new(attempts.clone()),
        delivery: Arc::new(FailingDelivery),
        settings: Arc::new(test_settings()),
    };

    let out = uc.execute(input("alice@example.com")).await.unwrap();

    let stored = attempts.get(out.attempt_id).await.unwrap();
    assert!(stored.is_some(), "attempt must survive a delivery failure");
    attempts
        .try_consume(out.attempt_id, &out.code)
        .await
        .unwrap();
}

#[tokio::test]
async fn should_report_store_outage_as_unavailable() {
    let uc = IssueCodeUseCase {
        attempts: Arc::new(UnavailableAttemptStore),
        delivery: Arc::new(FailingDelivery),
        settings: Arc::new(test_settings()),
    };

    let result = uc.execute(input("alice@example.com")).await;

    assert!(
        matches!(result, Err(GatewayError::StoreUnavailable(_))),
        "expected StoreUnavailable, got {result:?}"
    );
}
