use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::repository::{LoginAttemptStore, SessionRepository};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub attempts: u64,
    pub sessions: u64,
}

/// Deletes expired attempts and dead sessions.
#[derive(Clone)]
pub struct Reaper {
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Reaper {
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReapReport, StoreError> {
        let attempts = self.attempts.purge_expired(now).await?;
        let sessions = self.sessions.purge_expired(now).await?;
        Ok(ReapReport { attempts, sessions })
    }

    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.run_once(Utc::now()).await {
                    Ok(report) if report == ReapReport::default() => {}
                    Ok(report) => info!(
                        attempts = report.attempts,
                        sessions = report.sessions,
                        "reaped expired records"
                    ),
                    Err(e) => warn!(error = ?e, "reaper pass failed"),
                }
            }
        })
    }
}
