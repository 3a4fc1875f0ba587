//! Notification outbox rows.

use crewline_core::define_text_status;
use crewline_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

define_text_status! {
    /// Delivery state of a queued email.
    OutboxStatus {
        Pending => "pending",
        Sending => "sending",
        Sent => "sent",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessage {
    pub id: DbId,
    pub recipient: String,
    pub subject: String,
    pub html: String,
    #[sqlx(try_from = "String")]
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
