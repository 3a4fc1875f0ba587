//! Crewline notification delivery.
//!
//! Request handlers never talk to SMTP. They write rows to the
//! `notification_outbox` table inside their own transaction, and the
//! [`OutboxDispatcher`] delivers them in the background:
//!
//! - [`Mailer`] is the delivery seam, with an SMTP implementation
//!   ([`SmtpMailer`]) and a logging fallback ([`LogMailer`]) used when SMTP is
//!   not configured.
//! - [`OutboxDispatcher`] claims due rows, sends them and reschedules
//!   failures with exponential backoff.

pub mod delivery;
pub mod outbox;

pub use delivery::email::{EmailConfig, SmtpMailer};
pub use delivery::log::LogMailer;
pub use delivery::{MailError, Mailer};
pub use outbox::{DispatcherConfig, OutboxDispatcher};
