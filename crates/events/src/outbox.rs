//! Background delivery of the notification outbox.
//!
//! [`OutboxDispatcher`] runs as a background task. Each tick it claims due
//! rows (see [`OutboxRepo::claim_due`]), hands them to the configured
//! [`Mailer`] and records the outcome:
//!
//! - success: `sent`;
//! - transient failure: back to `pending`, next attempt after
//!   `30s * 2^attempts` (capped at one hour);
//! - permanent failure, or the final attempt: `failed`.
//!
//! A dispatcher that dies mid-send leaves rows in `sending`; they are
//! reclaimed once their claim is older than `stale_after`, so delivery is
//! at-least-once. Each reclaim counts as an attempt, and a row that has used
//! every attempt this way is failed without another send.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crewline_core::email_templates::EmailMessage;
use crewline_db::models::outbox::OutboxMessage;
use crewline_db::repositories::OutboxRepo;
use crewline_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::delivery::Mailer;

/// Attempts after which a message is marked `failed`.
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;

const BASE_RETRY_DELAY_SECS: i64 = 30;
const MAX_RETRY_DELAY_SECS: i64 = 3600;

/// Delay before the next attempt, given the number of attempts already made
/// (including the one that just failed).
pub fn retry_delay(attempts_made: i32) -> chrono::Duration {
    let exp = attempts_made.clamp(0, 16) as u32;
    let secs = BASE_RETRY_DELAY_SECS
        .saturating_mul(2_i64.saturating_pow(exp))
        .min(MAX_RETRY_DELAY_SECS);
    chrono::Duration::seconds(secs)
}

/// Tuning knobs for the dispatcher loop.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    /// Age after which a `sending` claim is considered abandoned.
    pub stale_after: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Outcome counts of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

pub struct OutboxDispatcher {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>, config: DispatcherConfig) -> Self {
        Self {
            pool,
            mailer,
            config,
        }
    }

    /// Run the dispatch loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Outbox dispatcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.dispatch_once().await {
                        Ok(stats) if stats != DispatchStats::default() => {
                            tracing::info!(
                                sent = stats.sent,
                                retried = stats.retried,
                                failed = stats.failed,
                                "Outbox batch processed"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Outbox dispatch failed"),
                    }
                }
            }
        }
    }

    /// Claim and process one batch of due messages.
    pub async fn dispatch_once(&self) -> Result<DispatchStats, sqlx::Error> {
        let stale_after = self.config.stale_after.as_secs() as i64;
        let claimed = OutboxRepo::claim_due(&self.pool, self.config.batch_size, stale_after).await?;

        let mut stats = DispatchStats::default();
        for row in claimed {
            self.deliver(row, &mut stats).await?;
        }
        Ok(stats)
    }

    async fn deliver(&self, row: OutboxMessage, stats: &mut DispatchStats) -> Result<(), sqlx::Error> {
        if row.attempts >= MAX_DELIVERY_ATTEMPTS {
            tracing::error!(
                outbox_id = row.id,
                to = %row.recipient,
                attempts = row.attempts,
                "Email delivery abandoned after repeated interrupted sends"
            );
            OutboxRepo::abandon(&self.pool, row.id, "Delivery interrupted too many times").await?;
            stats.failed += 1;
            return Ok(());
        }

        let message = EmailMessage {
            to: row.recipient,
            subject: row.subject,
            html: row.html,
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                OutboxRepo::mark_sent(&self.pool, row.id).await?;
                stats.sent += 1;
            }
            Err(e) => {
                let attempts_made = row.attempts + 1;
                let error = e.to_string();
                if e.is_permanent() || attempts_made >= MAX_DELIVERY_ATTEMPTS {
                    tracing::error!(
                        outbox_id = row.id,
                        to = %message.to,
                        attempts = attempts_made,
                        error = %error,
                        "Email delivery failed permanently"
                    );
                    OutboxRepo::mark_failed(&self.pool, row.id, &error).await?;
                    stats.failed += 1;
                } else {
                    let next = Utc::now() + retry_delay(attempts_made);
                    tracing::warn!(
                        outbox_id = row.id,
                        to = %message.to,
                        attempts = attempts_made,
                        next_attempt_at = %next,
                        error = %error,
                        "Email delivery failed, will retry"
                    );
                    OutboxRepo::reschedule(&self.pool, row.id, &error, next).await?;
                    stats.retried += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(0).num_seconds(), 30);
        assert_eq!(retry_delay(1).num_seconds(), 60);
        assert_eq!(retry_delay(2).num_seconds(), 120);
        assert_eq!(retry_delay(4).num_seconds(), 480);
        assert_eq!(retry_delay(7).num_seconds(), 3600);
        assert_eq!(retry_delay(40).num_seconds(), 3600);
    }

    #[test]
    fn retry_delay_is_monotonic() {
        let delays: Vec<i64> = (0..12).map(|a| retry_delay(a).num_seconds()).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }
}
