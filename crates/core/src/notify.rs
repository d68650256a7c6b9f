use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// A fully composed notification intent: who gets told what. Delivery is the
/// dispatcher's problem, not the engine's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification capability. Callers treat delivery as best-effort:
/// an `Err` is logged and swallowed, never surfaced as an operation failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Logs each notification instead of delivering it. Used when no SMTP relay
/// is configured and in the operator CLI.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Captures notifications for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification.clone()),
            Err(poisoned) => poisoned.into_inner().push(notification.clone()),
        }
        Ok(())
    }
}

/// Always fails; lets tests prove delivery failure never fails a transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError("relay unreachable".to_string()))
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn wrap_html(subject: &str, inner: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>{}</title></head>\n<body>\n{inner}\n</body>\n</html>",
        escape_html(subject)
    )
}

/// Per-transition message composition. Each lifecycle transition hard-codes
/// its recipient set and intent; there is no generic event bus.
pub mod messages {
    use super::{escape_html, wrap_html, Notification};
    use crate::domain::request::RequestId;
    use crate::domain::user::Contact;

    fn compose(to: &Contact, subject: &str, text: String, body_lines: &[String]) -> Notification {
        let greeting = format!("<p>Hello {},</p>", escape_html(&to.name));
        let paragraphs: String =
            body_lines.iter().map(|line| format!("<p>{line}</p>")).collect();
        let inner = format!("{greeting}\n{paragraphs}\n<p>Regards,</p>\n<p>The Tripdesk team</p>");
        Notification {
            to: to.email.clone(),
            subject: subject.to_string(),
            text,
            html: wrap_html(subject, &inner),
        }
    }

    pub fn request_assigned(admin: &Contact, request_id: &RequestId) -> Notification {
        let subject = "New travel request assigned";
        compose(
            admin,
            subject,
            format!(
                "You have been assigned a new travel request with ID: {}. Please review the details in the system.",
                request_id.0
            ),
            &[format!(
                "You have been assigned a new travel request with ID: <strong>{}</strong>.",
                escape_html(&request_id.0)
            ),
            "Please review the details in the system.".to_string()],
        )
    }

    pub fn request_updated(admin: &Contact, request_id: &RequestId) -> Notification {
        let subject = "Travel request updated";
        compose(
            admin,
            subject,
            format!(
                "The travel request with ID: {} has been updated. Please review the details in the system.",
                request_id.0
            ),
            &[format!(
                "The travel request with ID: <strong>{}</strong> has been updated.",
                escape_html(&request_id.0)
            ),
            "Please review the details in the system.".to_string()],
        )
    }

    pub fn request_approved(owner: &Contact, title: &str) -> Notification {
        let subject = "Travel request approved";
        compose(
            owner,
            subject,
            format!(
                "Your travel request \"{title}\" has been approved and is pending reservations."
            ),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been approved and is pending reservations.",
                escape_html(title)
            ),
            "Please wait while the necessary reservations are made.".to_string()],
        )
    }

    pub fn agency_assignment(agent: &Contact, title: &str) -> Notification {
        let subject = "New approved travel request";
        compose(
            agent,
            subject,
            format!(
                "The travel request \"{title}\" has been approved and is pending reservations."
            ),
            &[format!(
                "The travel request \"<strong>{}</strong>\" has been approved and is pending reservations.",
                escape_html(title)
            ),
            "Please review the request details and proceed with the necessary reservations."
                .to_string()],
        )
    }

    pub fn request_denied(owner: &Contact, title: &str) -> Notification {
        let subject = "Travel request denied";
        compose(
            owner,
            subject,
            format!("Your travel request \"{title}\" has been denied."),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been denied.",
                escape_html(title)
            ),
            "Please review your request details and consider making the necessary changes."
                .to_string()],
        )
    }

    pub fn request_cancelled(owner: &Contact, title: &str) -> Notification {
        let subject = "Travel request cancelled";
        compose(
            owner,
            subject,
            format!("Your travel request \"{title}\" has been cancelled."),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been cancelled.",
                escape_html(title)
            )],
        )
    }

    pub fn changes_requested(owner: &Contact, title: &str, comment: &str) -> Notification {
        let subject = "Changes requested on your travel request";
        compose(
            owner,
            subject,
            format!(
                "Your travel request \"{title}\" has been marked as needing changes. Comments: {comment}"
            ),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been marked as needing changes. Please review the comments and adjust your request.",
                escape_html(title)
            ),
            "Comments:".to_string(),
            escape_html(comment)],
        )
    }

    pub fn accounting_review_due(soi: &Contact, title: &str) -> Notification {
        let subject = "Travel request awaiting accounting approval";
        compose(
            soi,
            subject,
            format!(
                "The travel request \"{title}\" has finished reservations and is awaiting your accounting approval."
            ),
            &[format!(
                "The travel request \"<strong>{}</strong>\" has finished reservations and is awaiting your accounting approval.",
                escape_html(title)
            )],
        )
    }

    pub fn accounting_approved(owner: &Contact, title: &str) -> Notification {
        let subject = "Travel request approved by accounting";
        compose(
            owner,
            subject,
            format!("Your travel request \"{title}\" has been approved by accounting."),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been approved by accounting.",
                escape_html(title)
            ),
            "You can now download your reservations and carry out your trip.".to_string(),
            "Once the trip is over, you can start submitting your expense vouchers.".to_string()],
        )
    }

    pub fn vouchers_review_due(admin: &Contact, title: &str) -> Notification {
        let subject = "Travel request awaiting voucher approval";
        compose(
            admin,
            subject,
            format!(
                "The travel request \"{title}\" has finished uploading vouchers and is awaiting your approval."
            ),
            &[format!(
                "The travel request \"<strong>{}</strong>\" has finished uploading vouchers and is awaiting your approval.",
                escape_html(title)
            ),
            "Please review the uploaded vouchers and proceed with the approval.".to_string()],
        )
    }

    pub fn vouchers_approved(owner: &Contact, title: &str) -> Notification {
        let subject = "Trip expense report approved";
        compose(
            owner,
            subject,
            format!(
                "Your expense report for the trip \"{title}\" has been approved and is awaiting refund approval."
            ),
            &[format!(
                "Your expense report for the trip \"<strong>{}</strong>\" has been approved and is awaiting refund approval.",
                escape_html(title)
            )],
        )
    }

    pub fn refund_review_due(soi: &Contact, title: &str) -> Notification {
        let subject = "Travel request awaiting refund approval";
        compose(
            soi,
            subject,
            format!(
                "The travel request \"{title}\" has finished its expense report and is awaiting your refund approval."
            ),
            &[format!(
                "The travel request \"<strong>{}</strong>\" has finished its expense report and is awaiting your refund approval.",
                escape_html(title)
            )],
        )
    }

    pub fn request_completed(owner: &Contact, title: &str) -> Notification {
        let subject = "Travel request completed";
        compose(
            owner,
            subject,
            format!("Your travel request \"{title}\" has been completed and registered."),
            &[format!(
                "Your travel request \"<strong>{}</strong>\" has been completed and registered.",
                escape_html(title)
            ),
            "Your refund will be processed shortly if applicable.".to_string()],
        )
    }
}
