//! Inbound mail retrieval via the Resend receiving API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AttachmentMeta, Download, EmailContent, Mailbox};
use crate::error::MailError;

/// REST client for the inbound-mail provider.
pub struct ResendMailbox {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ResendMailbox {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    fn email_url(&self, email_id: &str) -> String {
        format!("{}/emails/{email_id}", self.base_url)
    }

    fn attachments_url(&self, email_id: &str) -> String {
        format!("{}/emails/{email_id}/attachments", self.base_url)
    }
}

/// Envelope around the attachment list.
#[derive(Debug, Deserialize)]
struct AttachmentList {
    #[serde(default)]
    data: Vec<AttachmentMeta>,
}

#[async_trait]
impl Mailbox for ResendMailbox {
    async fn attachments(&self, email_id: &str) -> Result<Vec<AttachmentMeta>, MailError> {
        let response = self
            .http
            .get(self.attachments_url(email_id))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| MailError::Request(format!("attachment list: {e}")))?
            .error_for_status()
            .map_err(|e| MailError::Request(format!("attachment list: {e}")))?;

        let list: AttachmentList = response
            .json()
            .await
            .map_err(|e| MailError::Decode(format!("attachment list: {e}")))?;
        Ok(list.data)
    }

    async fn body(&self, email_id: &str) -> Result<EmailContent, MailError> {
        let response = self
            .http
            .get(self.email_url(email_id))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| MailError::Request(format!("email fetch: {e}")))?
            .error_for_status()
            .map_err(|e| MailError::Request(format!("email fetch: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| MailError::Decode(format!("email fetch: {e}")))
    }

    async fn download(&self, url: &str) -> Result<Download, MailError> {
        // Status is data here: the intake stage decides what non-200 means.
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MailError::Request(format!("attachment download: {e}")))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MailError::Request(format!("attachment download: {e}")))?;

        Ok(Download {
            status,
            bytes: bytes.to_vec(),
        })
    }
}
