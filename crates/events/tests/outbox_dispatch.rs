//! Dispatcher tests against a real database with an in-memory mailer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crewline_core::email_templates::EmailMessage;
use crewline_db::models::outbox::OutboxStatus;
use crewline_db::repositories::OutboxRepo;
use crewline_events::outbox::{DispatchStats, MAX_DELIVERY_ATTEMPTS};
use crewline_events::{DispatcherConfig, MailError, Mailer, OutboxDispatcher};
use sqlx::PgPool;

/// Records every message and fails while `fail` is set.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: Mutex<bool>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if *self.fail.lock().unwrap() {
            return Err(MailError::Unavailable("connection refused".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn message(to: &str) -> EmailMessage {
    EmailMessage {
        to: to.into(),
        subject: "Subject".into(),
        html: "<p>Body</p>".into(),
    }
}

fn dispatcher(pool: &PgPool, mailer: Arc<RecordingMailer>) -> OutboxDispatcher {
    OutboxDispatcher::new(pool.clone(), mailer, DispatcherConfig::default())
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_messages_are_sent_once(pool: PgPool) {
    OutboxRepo::enqueue(&pool, &message("a@example.com")).await.unwrap();
    OutboxRepo::enqueue(&pool, &message("b@example.com")).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let d = dispatcher(&pool, mailer.clone());

    let stats = d.dispatch_once().await.unwrap();
    assert_eq!(
        stats,
        DispatchStats {
            sent: 2,
            retried: 0,
            failed: 0
        }
    );
    assert_eq!(d.dispatch_once().await.unwrap(), DispatchStats::default());
    assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    assert_eq!(OutboxRepo::count_by_status(&pool, OutboxStatus::Sent).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transient_failure_is_rescheduled(pool: PgPool) {
    OutboxRepo::enqueue(&pool, &message("retry@example.com")).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    *mailer.fail.lock().unwrap() = true;
    let d = dispatcher(&pool, mailer.clone());

    let stats = d.dispatch_once().await.unwrap();
    assert_eq!(stats.retried, 1);

    let rows = OutboxRepo::list_for_recipient(&pool, "retry@example.com").await.unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Pending);
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].last_error.is_some());
    assert!(rows[0].next_attempt_at > chrono::Utc::now());

    // Not due yet.
    assert_eq!(d.dispatch_once().await.unwrap(), DispatchStats::default());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_final_attempt_marks_failed(pool: PgPool) {
    let id = OutboxRepo::enqueue(&pool, &message("doomed@example.com")).await.unwrap();
    sqlx::query("UPDATE notification_outbox SET attempts = $2 WHERE id = $1")
        .bind(id)
        .bind(MAX_DELIVERY_ATTEMPTS - 1)
        .execute(&pool)
        .await
        .unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    *mailer.fail.lock().unwrap() = true;
    let stats = dispatcher(&pool, mailer).dispatch_once().await.unwrap();
    assert_eq!(stats.failed, 1);

    let rows = OutboxRepo::list_for_recipient(&pool, "doomed@example.com").await.unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Failed);
    assert_eq!(rows[0].attempts, MAX_DELIVERY_ATTEMPTS);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repeatedly_interrupted_send_is_abandoned(pool: PgPool) {
    let id = OutboxRepo::enqueue(&pool, &message("crashy@example.com")).await.unwrap();
    let stale_after = DispatcherConfig::default().stale_after.as_secs() as i64;

    // Each round the row is claimed and the dispatcher "dies" before
    // recording an outcome.
    for expected in 0..MAX_DELIVERY_ATTEMPTS {
        let claimed = OutboxRepo::claim_due(&pool, 10, stale_after).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempts, expected);
        sqlx::query(
            "UPDATE notification_outbox SET claimed_at = NOW() - INTERVAL '1 hour' WHERE id = $1",
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    }

    let mailer = Arc::new(RecordingMailer::default());
    let stats = dispatcher(&pool, mailer.clone()).dispatch_once().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert!(mailer.sent.lock().unwrap().is_empty());

    let rows = OutboxRepo::list_for_recipient(&pool, "crashy@example.com").await.unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Failed);
    assert_eq!(rows[0].attempts, MAX_DELIVERY_ATTEMPTS);
    assert!(OutboxRepo::claim_due(&pool, 10, stale_after).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_address_fails_without_retry(pool: PgPool) {
    OutboxRepo::enqueue(&pool, &message("not-an-address")).await.unwrap();

    let config = crewline_events::EmailConfig {
        smtp_host: "localhost".into(),
        smtp_port: 2525,
        from_address: "noreply@example.com".into(),
        smtp_user: None,
        smtp_password: None,
    };
    let mailer = Arc::new(crewline_events::SmtpMailer::new(config).unwrap());
    let d = OutboxDispatcher::new(pool.clone(), mailer, DispatcherConfig::default());

    let stats = d.dispatch_once().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(OutboxRepo::count_by_status(&pool, OutboxStatus::Failed).await.unwrap(), 1);
}
