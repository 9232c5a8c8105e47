//! Mail collaborators — inbound retrieval and outbound delivery.
//!
//! The pipeline only sees the two traits here; concrete backends
//! ([`resend::ResendMailbox`], [`smtp::SmtpMailer`]) are pure I/O.

pub mod resend;
pub mod smtp;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{DeliveryError, MailError};

pub use resend::ResendMailbox;
pub use smtp::SmtpMailer;

/// One attachment as listed by the mail provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentMeta {
    pub content_type: String,
    pub download_url: String,
}

/// The stored email content as returned by the mail provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailContent {
    /// HTML body; `None` when the email had no body.
    pub html: Option<String>,
}

/// Result of fetching an attachment's bytes.
///
/// Non-2xx statuses are returned as data, not errors — the intake stage owns
/// the policy for them.
#[derive(Debug, Clone)]
pub struct Download {
    pub status: u16,
    pub bytes: Vec<u8>,
}

/// Inbound mail retrieval, keyed by the provider's email id.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List the email's attachments.
    async fn attachments(&self, email_id: &str) -> Result<Vec<AttachmentMeta>, MailError>;

    /// Fetch the email's stored content.
    async fn body(&self, email_id: &str) -> Result<EmailContent, MailError>;

    /// Plain GET of an attachment's download URL.
    async fn download(&self, url: &str) -> Result<Download, MailError>;
}

/// A fully-addressed outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait ReplyMailer: Send + Sync {
    async fn send(&self, reply: &OutgoingReply) -> Result<(), DeliveryError>;
}
