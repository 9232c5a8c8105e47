//! Stage-transition events.
//!
//! Exactly one event flows out of each stage invocation. Non-terminal stages
//! return a two-variant outcome enum and the runner matches on the tag to pick
//! the next stage — stage wiring is type-driven, not inspected at runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Entry event — one per triggering email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReceived {
    pub sender: String,
    pub subject: String,
    pub email_id: String,
}

/// Intake success: the attachment is validated and on disk.
#[derive(Debug, Clone)]
pub struct EmailProcessed {
    pub attachment_file_path: PathBuf,
}

/// Classification success, values passed through from the classifier verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// One of "invoice" or "expense".
    pub classification: String,
    pub reason: String,
}

/// The event consumed by the dispatch stage.
///
/// Every stage that fails in a recognized way produces `Failure`; only the
/// extraction stage's happy path produces `Reply`. The two-variant shape
/// guarantees exactly one of body/error exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEmail {
    /// Success path: reply to the sender with this HTML body.
    Reply { body: String },
    /// Failure path: post this human-readable error to the alert webhook.
    Failure { error: String },
}

impl SendEmail {
    pub fn reply(body: impl Into<String>) -> Self {
        Self::Reply { body: body.into() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    /// The reply body, if this is the success path.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Reply { body } => Some(body),
            Self::Failure { .. } => None,
        }
    }

    /// The error message, if this is the failure path.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Reply { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// Terminal event, one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEvent {
    pub success: bool,
}

/// Intake stage output.
#[derive(Debug)]
pub enum IntakeOutcome {
    Processed(EmailProcessed),
    Rejected(SendEmail),
}

/// Classification stage output.
#[derive(Debug)]
pub enum ClassifyOutcome {
    Classified(ClassificationResult),
    Rejected(SendEmail),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_has_body_and_no_error() {
        let ev = SendEmail::reply("<p>hi</p>");
        assert_eq!(ev.body(), Some("<p>hi</p>"));
        assert_eq!(ev.error(), None);
    }

    #[test]
    fn failure_has_error_and_no_body() {
        let ev = SendEmail::failure("boom");
        assert_eq!(ev.body(), None);
        assert_eq!(ev.error(), Some("boom"));
    }

    #[test]
    fn email_received_deserializes_from_webhook_fields() {
        let ev: EmailReceived = serde_json::from_str(
            r#"{"sender": "a@b.com", "subject": "Invoice", "email_id": "em_1"}"#,
        )
        .unwrap();
        assert_eq!(ev.sender, "a@b.com");
        assert_eq!(ev.email_id, "em_1");
    }
}
