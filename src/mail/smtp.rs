//! Outbound delivery — SMTP via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{OutgoingReply, ReplyMailer};
use crate::config::SmtpConfig;
use crate::error::DeliveryError;

/// SMTP reply sender.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, reply: &OutgoingReply) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(reply
                .from
                .parse()
                .map_err(|e| DeliveryError::InvalidAddress(format!("from: {e}")))?)
            .to(reply
                .to
                .parse()
                .map_err(|e| DeliveryError::InvalidAddress(format!("to: {e}")))?)
            .reply_to(
                reply
                    .reply_to
                    .parse()
                    .map_err(|e| DeliveryError::InvalidAddress(format!("reply_to: {e}")))?,
            )
            .subject(&reply.subject)
            .header(ContentType::TEXT_HTML)
            .body(reply.html.clone())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl ReplyMailer for SmtpMailer {
    async fn send(&self, reply: &OutgoingReply) -> Result<(), DeliveryError> {
        let message = self.build_message(reply)?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );
        let transport = SmtpTransport::relay(&self.config.host)
            .map_err(|e| DeliveryError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        // lettre's sync transport; sends are rare (one per run), so run on the
        // blocking pool.
        let to = reply.to.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| DeliveryError::Transport(format!("send task failed: {e}")))?
            .map_err(|e| DeliveryError::Transport(format!("SMTP send failed: {e}")))?;

        tracing::info!("Reply sent to {to}");
        Ok(())
    }
}
