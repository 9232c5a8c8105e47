//! REST client for the document cloud's classify and extract endpoints.
//!
//! Both calls upload the scratch file as multipart and get JSON back. The
//! client stays policy-free: empty results are returned as-is for the
//! pipeline to interpret.

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{
    ClassifiedItem, Classifier, ClassifierRule, Extraction, ExtractionSchema, Extractor,
};
use crate::error::DocError;

pub struct CloudDocClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl CloudDocClient {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    async fn file_part(file: &Path) -> Result<reqwest::multipart::Part, DocError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(reqwest::multipart::Part::bytes(bytes).file_name(file_name))
    }
}

/// Envelope around a classification response.
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    items: Vec<ClassifiedItem>,
}

#[async_trait]
impl Classifier for CloudDocClient {
    async fn classify(
        &self,
        file: &Path,
        rules: &[ClassifierRule],
    ) -> Result<Vec<ClassifiedItem>, DocError> {
        let rules_json =
            serde_json::to_string(rules).map_err(|e| DocError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", Self::file_part(file).await?)
            .text("rules", rules_json);

        let response = self
            .http
            .post(format!("{}/classify", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| DocError::Request(format!("classify: {e}")))?
            .error_for_status()
            .map_err(|e| DocError::Request(format!("classify: {e}")))?;

        let parsed: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| DocError::Decode(format!("classify: {e}")))?;
        Ok(parsed.items)
    }
}

#[async_trait]
impl Extractor for CloudDocClient {
    async fn extract(
        &self,
        schema: ExtractionSchema,
        file: &Path,
    ) -> Result<Extraction, DocError> {
        let form = reqwest::multipart::Form::new()
            .part("file", Self::file_part(file).await?)
            .text("schema", schema.name());

        let response = self
            .http
            .post(format!("{}/extract", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| DocError::Request(format!("extract: {e}")))?
            .error_for_status()
            .map_err(|e| DocError::Request(format!("extract: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| DocError::Decode(format!("extract: {e}")))
    }
}
