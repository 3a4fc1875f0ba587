//! Mailer used when SMTP is not configured: logs instead of sending.

use async_trait::async_trait;
use crewline_core::email_templates::EmailMessage;

use super::{MailError, Mailer};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}
