use std::future::Future;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::OutboxSection;
use crate::error::EigerResult;

use super::outbox::{OutboxEntry, SqliteOutboxStore};

#[derive(Debug, Clone)]
pub struct FanoutConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub schedule: Vec<Duration>,
    pub jitter_seconds: u64,
    pub stale_after: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 5,
            schedule: vec![
                Duration::from_secs(30),
                Duration::from_secs(120),
                Duration::from_secs(600),
            ],
            jitter_seconds: 10,
            stale_after: Duration::from_secs(900),
        }
    }
}

impl From<&OutboxSection> for FanoutConfig {
    fn from(section: &OutboxSection) -> Self {
        let mut config = Self {
            poll_interval: Duration::from_secs(section.poll_interval_seconds.max(1)),
            max_attempts: section.max_attempts.max(1),
            schedule: section
                .schedule_seconds
                .iter()
                .map(|seconds| Duration::from_secs(*seconds))
                .collect(),
            jitter_seconds: section.jitter_seconds,
            stale_after: Duration::from_secs(section.stale_after_seconds),
        };
        if config.schedule.is_empty() {
            config.schedule = FanoutConfig::default().schedule;
        }
        config
    }
}

impl FanoutConfig {
    /// Wait before the retry following failed attempt number `attempts`.
    fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let index = attempts.saturating_sub(1) as usize;
        let base = self
            .schedule
            .get(index)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or_default();
        if self.jitter_seconds == 0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0..=self.jitter_seconds);
        base + Duration::from_secs(jitter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FanoutOutcome {
    Delivered {
        outbox_id: i64,
        metrics_written: usize,
    },
    Retried {
        outbox_id: i64,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
    },
    Dead {
        outbox_id: i64,
        attempts: u32,
    },
}

/// Drains the metric outbox into climber metrics.
#[derive(Debug)]
pub struct MetricFanout {
    store: SqliteOutboxStore,
    config: FanoutConfig,
}

impl MetricFanout {
    pub fn new(store: SqliteOutboxStore, config: FanoutConfig) -> Self {
        Self { store, config }
    }

    pub async fn run_loop(&self) -> EigerResult<()> {
        let stale_after = chrono::Duration::from_std(self.config.stale_after)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let released = self.store.release_stale(Utc::now() - stale_after)?;
        if released > 0 {
            info!(released, "released stale outbox entries");
        }
        loop {
            let processed = self.tick(Utc::now()).await?;
            if processed.is_none() {
                sleep(self.config.poll_interval).await;
            }
        }
    }

    /// Delivers at most one due entry.
    pub async fn tick(&self, now: DateTime<Utc>) -> EigerResult<Option<FanoutOutcome>> {
        let store = &self.store;
        self.tick_with(now, |entry| async move { store.deliver(&entry, now) })
            .await
    }

    /// Like [`MetricFanout::tick`] with a custom delivery step. A handler
    /// error counts as a failed attempt of the reserved entry.
    pub async fn tick_with<F, Fut>(
        &self,
        now: DateTime<Utc>,
        handler: F,
    ) -> EigerResult<Option<FanoutOutcome>>
    where
        F: FnOnce(OutboxEntry) -> Fut,
        Fut: Future<Output = EigerResult<usize>>,
    {
        let Some(entry) = self.store.reserve_due(now)? else {
            return Ok(None);
        };
        let outbox_id = entry.outbox_id;
        let attempts = entry.attempts + 1;
        match handler(entry).await {
            Ok(metrics_written) => {
                info!(outbox_id, metrics_written, "metric fan-out delivered");
                Ok(Some(FanoutOutcome::Delivered {
                    outbox_id,
                    metrics_written,
                }))
            }
            Err(err) => {
                let message = err.to_string();
                if attempts >= self.config.max_attempts {
                    warn!(outbox_id, attempts, error = %message, "metric fan-out gave up");
                    self.store.mark_dead(outbox_id, attempts, &message, now)?;
                    return Ok(Some(FanoutOutcome::Dead {
                        outbox_id,
                        attempts,
                    }));
                }
                let delay = self.config.delay_for_attempt(attempts);
                let next_attempt_at =
                    now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
                warn!(
                    outbox_id,
                    attempts,
                    error = %message,
                    next_attempt_at = %next_attempt_at,
                    "metric fan-out failed, rescheduling"
                );
                self.store
                    .reschedule(outbox_id, attempts, next_attempt_at, &message, now)?;
                Ok(Some(FanoutOutcome::Retried {
                    outbox_id,
                    attempts,
                    next_attempt_at,
                }))
            }
        }
    }

    /// Delivers every entry due at `now`.
    pub async fn drain(&self, now: DateTime<Utc>) -> EigerResult<Vec<FanoutOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.tick(now).await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
