//! HTML email bodies for notification side effects.
//!
//! Every notification is rendered into an [`EmailMessage`] here and stored in
//! the outbox by the handler that triggers it. User-supplied text is always
//! passed through [`escape_html`].

use crate::leave::duration_days;
use crate::types::Date;

/// A rendered email ready to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">\
         <h2>{heading}</h2>{body}\
         <p style=\"color:#888;font-size:12px\">This is an automated message from Crewline.</p>\
         </body></html>"
    )
}

fn message(to: &str, subject: impl Into<String>, html: String) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: subject.into(),
        html,
    }
}

/// Welcome email carrying generated login credentials.
pub fn welcome_credentials(to: &str, first_name: &str, password: &str) -> EmailMessage {
    let body = format!(
        "<p>Hello {},</p><p>Your Crewline account has been created.</p>\
         <p>Email: <strong>{}</strong><br/>Temporary password: <strong>{}</strong></p>\
         <p>Please sign in and change your password.</p>",
        escape_html(first_name),
        escape_html(to),
        escape_html(password),
    );
    message(to, "Your Crewline account", layout("Welcome to Crewline", &body))
}

/// One-time verification code.
pub fn otp_code(to: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    let body = format!(
        "<p>Your verification code is:</p>\
         <p style=\"font-size:24px;letter-spacing:4px\"><strong>{}</strong></p>\
         <p>The code expires in {ttl_minutes} minutes.</p>",
        escape_html(code),
    );
    message(to, "Your verification code", layout("Verification code", &body))
}

/// Leave request decided.
pub fn leave_decision(
    to: &str,
    first_name: &str,
    status: &str,
    start: Date,
    end: Date,
    note: Option<&str>,
) -> EmailMessage {
    let note_html = note
        .map(|n| format!("<p>Note: {}</p>", escape_html(n)))
        .unwrap_or_default();
    let days = duration_days(start, end);
    let unit = if days == 1 { "day" } else { "days" };
    let body = format!(
        "<p>Hello {},</p><p>Your leave request from {start} to {end} ({days} {unit}) \
         has been <strong>{}</strong>.</p>{note_html}",
        escape_html(first_name),
        escape_html(status),
    );
    message(
        to,
        format!("Leave request {status}"),
        layout("Leave request update", &body),
    )
}

/// Proposal submitted for review, sent to each supervisor.
pub fn proposal_submitted(to: &str, title: &str, submitter: &str) -> EmailMessage {
    let body = format!(
        "<p>{} submitted the proposal <strong>{}</strong> for review.</p>",
        escape_html(submitter),
        escape_html(title),
    );
    message(
        to,
        format!("Proposal submitted: {title}"),
        layout("Proposal awaiting decision", &body),
    )
}

/// Proposal decided, sent to the submitter.
pub fn proposal_decided(to: &str, title: &str, status: &str, note: Option<&str>) -> EmailMessage {
    let note_html = note
        .map(|n| format!("<p>Note: {}</p>", escape_html(n)))
        .unwrap_or_default();
    let body = format!(
        "<p>Your proposal <strong>{}</strong> is now <strong>{}</strong>.</p>{note_html}",
        escape_html(title),
        escape_html(status),
    );
    message(
        to,
        format!("Proposal {status}: {title}"),
        layout("Proposal decision", &body),
    )
}

/// Project reached `Done`, sent to each associated client.
pub fn project_completed(to: &str, contact_name: &str, project_name: &str) -> EmailMessage {
    let body = format!(
        "<p>Hello {},</p><p>The project <strong>{}</strong> has been completed.</p>",
        escape_html(contact_name),
        escape_html(project_name),
    );
    message(
        to,
        format!("Project completed: {project_name}"),
        layout("Project completed", &body),
    )
}

/// New client registration awaiting approval, sent to admins.
pub fn client_registered(to: &str, company_name: &str, contact_email: &str) -> EmailMessage {
    let body = format!(
        "<p><strong>{}</strong> ({}) registered and is awaiting approval.</p>",
        escape_html(company_name),
        escape_html(contact_email),
    );
    message(
        to,
        format!("Client awaiting approval: {company_name}"),
        layout("New client registration", &body),
    )
}

/// Client approval decided.
pub fn client_approval(
    to: &str,
    contact_name: &str,
    status: &str,
    reason: Option<&str>,
) -> EmailMessage {
    let reason_html = reason
        .map(|r| format!("<p>Reason: {}</p>", escape_html(r)))
        .unwrap_or_default();
    let body = format!(
        "<p>Hello {},</p><p>Your client account has been <strong>{}</strong>.</p>{reason_html}",
        escape_html(contact_name),
        escape_html(status),
    );
    message(
        to,
        format!("Client account {status}"),
        layout("Account review", &body),
    )
}

/// High-severity incident report, sent to supervisors.
pub fn hse_escalation(
    to: &str,
    title: &str,
    severity: &str,
    location: Option<&str>,
    reporter: &str,
) -> EmailMessage {
    let location_html = location
        .map(|l| format!("<br/>Location: {}", escape_html(l)))
        .unwrap_or_default();
    let body = format!(
        "<p>A <strong>{}</strong> severity incident was reported by {}.</p>\
         <p>Title: {}{location_html}</p>",
        escape_html(severity),
        escape_html(reporter),
        escape_html(title),
    );
    message(
        to,
        format!("[HSE {severity}] {title}"),
        layout("Incident reported", &body),
    )
}

/// Task assigned to a user.
pub fn task_assigned(to: &str, first_name: &str, task_title: &str, project_name: &str) -> EmailMessage {
    let body = format!(
        "<p>Hello {},</p><p>You have been assigned the task <strong>{}</strong> \
         on project <strong>{}</strong>.</p>",
        escape_html(first_name),
        escape_html(task_title),
        escape_html(project_name),
    );
    message(
        to,
        format!("New task: {task_title}"),
        layout("Task assigned", &body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn user_text_is_escaped_in_body() {
        let msg = project_completed("c@example.com", "<b>Ann</b>", "Bridge");
        assert!(msg.html.contains("&lt;b&gt;Ann&lt;/b&gt;"));
        assert!(!msg.html.contains("<b>Ann</b>"));
        assert_eq!(msg.to, "c@example.com");
        assert_eq!(msg.subject, "Project completed: Bridge");
    }

    #[test]
    fn otp_email_contains_code_and_ttl() {
        let msg = otp_code("u@example.com", "012345", 10);
        assert!(msg.html.contains("012345"));
        assert!(msg.html.contains("10 minutes"));
    }

    #[test]
    fn optional_note_is_omitted_when_absent() {
        let start = Date::from_ymd_opt(2026, 5, 1).unwrap();
        let end = Date::from_ymd_opt(2026, 5, 3).unwrap();
        let msg = leave_decision("u@example.com", "Sam", "approved", start, end, None);
        assert!(!msg.html.contains("Note:"));
        assert_eq!(msg.subject, "Leave request approved");
    }

    #[test]
    fn leave_decision_states_inclusive_day_count() {
        let start = Date::from_ymd_opt(2026, 5, 1).unwrap();
        let msg = leave_decision("u@example.com", "Sam", "rejected", start, start, Some("busy"));
        assert!(msg.html.contains("(1 day)"));
        assert!(msg.html.contains("Note: busy"));

        let end = Date::from_ymd_opt(2026, 5, 5).unwrap();
        let msg = leave_decision("u@example.com", "Sam", "approved", start, end, None);
        assert!(msg.html.contains("(5 days)"));
    }
}
