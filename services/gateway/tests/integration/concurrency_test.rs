use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;

use latchkey_gateway::domain::repository::{LoginAttemptStore, UserRepository};
use latchkey_gateway::domain::types::LoginAttempt;
use latchkey_gateway::error::ConsumeError;
use latchkey_gateway::infra::memory::{MemoryLoginAttemptStore, MemoryUserRepository};

use crate::helpers::email;

const RACERS: usize = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_exactly_one_racer_consume_an_attempt() {
    let store = Arc::new(MemoryLoginAttemptStore::new());
    let attempt = LoginAttempt::new(
        email("alice@example.com"),
        "racy-code",
        Utc::now(),
        Duration::minutes(15),
    );
    store.put(&attempt).await.unwrap();

    let tasks = (0..RACERS).map(|_| {
        let store = store.clone();
        let id = attempt.id;
        tokio::spawn(async move { store.try_consume(id, "racy-code").await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let already = results
        .iter()
        .filter(|r| matches!(r, Err(ConsumeError::AlreadyConsumed)))
        .count();
    assert_eq!(wins, 1, "exactly one racer must win");
    assert_eq!(already, RACERS - 1, "every loser must see AlreadyConsumed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_converge_concurrent_first_logins_on_one_user() {
    let users = Arc::new(MemoryUserRepository::new());

    let tasks = (0..RACERS).map(|_| {
        let users = users.clone();
        tokio::spawn(async move {
            users
                .find_or_create_by_email(&email("new@example.com"))
                .await
        })
    });
    let ids: HashSet<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();

    assert_eq!(ids.len(), 1);
    assert_eq!(users.len(), 1);
}
