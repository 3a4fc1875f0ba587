//! Repository for the `notification_outbox` table.
//!
//! Handlers enqueue rows inside their own transaction; the dispatcher claims
//! due rows with `FOR UPDATE SKIP LOCKED` so several dispatchers never send
//! the same row concurrently.

use crewline_core::email_templates::EmailMessage;
use crewline_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgExecutor};

use crate::models::outbox::{OutboxMessage, OutboxStatus};

const COLUMNS: &str = "id, recipient, subject, html, status, attempts, last_error, \
    next_attempt_at, claimed_at, sent_at, created_at";

pub struct OutboxRepo;

impl OutboxRepo {
    /// Queue one email for delivery.
    pub async fn enqueue(db: impl PgExecutor<'_>, message: &EmailMessage) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO notification_outbox (recipient, subject, html) VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(&message.to)
        .bind(&message.subject)
        .bind(&message.html)
        .fetch_one(db)
        .await
    }

    /// Queue several emails on one connection.
    pub async fn enqueue_all(
        conn: &mut PgConnection,
        messages: &[EmailMessage],
    ) -> Result<(), sqlx::Error> {
        for message in messages {
            Self::enqueue(&mut *conn, message).await?;
        }
        Ok(())
    }

    /// Claim up to `batch` due rows: `pending` rows whose `next_attempt_at`
    /// has passed, plus `sending` rows claimed more than `stale_after_secs`
    /// ago by a dispatcher that never finished. Reclaiming a stale row counts
    /// the interrupted send as an attempt.
    pub async fn claim_due(
        db: impl PgExecutor<'_>,
        batch: i64,
        stale_after_secs: i64,
    ) -> Result<Vec<OutboxMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_outbox SET
                attempts = attempts + CASE WHEN status = 'sending' THEN 1 ELSE 0 END,
                status = 'sending',
                claimed_at = NOW()
             WHERE id IN (
                SELECT id FROM notification_outbox
                WHERE (status = 'pending' AND next_attempt_at <= NOW())
                   OR (status = 'sending' AND claimed_at < NOW() - make_interval(secs => $2))
                ORDER BY next_attempt_at ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(batch)
            .bind(stale_after_secs as f64)
            .fetch_all(db)
            .await
    }

    pub async fn mark_sent(db: impl PgExecutor<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_outbox
             SET status = 'sent', sent_at = NOW(), attempts = attempts + 1, last_error = NULL
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Record a failed attempt and schedule the next one.
    pub async fn reschedule(
        db: impl PgExecutor<'_>,
        id: DbId,
        error: &str,
        next_attempt_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_outbox
             SET status = 'pending', attempts = attempts + 1, last_error = $2,
                 next_attempt_at = $3, claimed_at = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Give up on a row after its final attempt.
    pub async fn mark_failed(db: impl PgExecutor<'_>, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_outbox
             SET status = 'failed', attempts = attempts + 1, last_error = $2, claimed_at = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Fail a row without counting another attempt.
    pub async fn abandon(db: impl PgExecutor<'_>, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_outbox
             SET status = 'failed', last_error = $2, claimed_at = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Messages queued for a recipient, oldest first.
    pub async fn list_for_recipient(
        db: impl PgExecutor<'_>,
        recipient: &str,
    ) -> Result<Vec<OutboxMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_outbox WHERE recipient = $1 ORDER BY id"
        );
        sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(recipient)
            .fetch_all(db)
            .await
    }

    /// Number of rows in `status`.
    pub async fn count_by_status(db: impl PgExecutor<'_>, status: OutboxStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM notification_outbox WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_one(db)
        .await
    }
}
