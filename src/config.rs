//! Configuration types, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Default run-level timeout for one pipeline run (all four stages).
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 600;

/// Inbound mail provider API configuration.
#[derive(Debug, Clone)]
pub struct MailApiConfig {
    pub api_key: SecretString,
    pub base_url: String,
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub reply_to: String,
}

/// Document cloud (classification + extraction) API configuration.
#[derive(Debug, Clone)]
pub struct DocCloudConfig {
    pub api_key: SecretString,
    pub base_url: String,
}

/// Full agent configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Webhook server bind address, e.g. "0.0.0.0:8080".
    pub bind_addr: String,
    /// Wall-clock bound for one whole pipeline run.
    pub run_timeout: Duration,
    pub mail_api: MailApiConfig,
    pub smtp: SmtpConfig,
    pub doc_cloud: DocCloudConfig,
    pub llm: LlmConfig,
    /// Webhook URL that receives `{"content": ...}` failure alerts.
    pub alert_webhook_url: String,
}

impl AppConfig {
    /// Build the full configuration from environment variables.
    ///
    /// Required: `MAIL_API_KEY`, `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `FROM_ADDRESS`, `DOC_CLOUD_API_KEY`, `ALERT_WEBHOOK_URL`, and the API
    /// key matching the selected LLM backend. Everything else has defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let run_timeout_secs: u64 = match std::env::var("RUN_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RUN_TIMEOUT_SECS".into(),
                message: format!("not a number of seconds: {raw}"),
            })?,
            Err(_) => DEFAULT_RUN_TIMEOUT_SECS,
        };

        let mail_api = MailApiConfig {
            api_key: SecretString::from(required("MAIL_API_KEY")?),
            base_url: std::env::var("MAIL_API_BASE")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
        };

        let smtp_host = required("SMTP_HOST")?;
        let smtp_port: u16 = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);
        let username = required("SMTP_USERNAME")?;
        let from_address = required("FROM_ADDRESS")?;
        let smtp = SmtpConfig {
            host: smtp_host,
            port: smtp_port,
            username: username.clone(),
            password: required("SMTP_PASSWORD")?,
            reply_to: std::env::var("REPLY_TO_ADDRESS")
                .unwrap_or_else(|_| from_address.clone()),
            from_address,
        };

        let doc_cloud = DocCloudConfig {
            api_key: SecretString::from(required("DOC_CLOUD_API_KEY")?),
            base_url: std::env::var("DOC_CLOUD_API_BASE")
                .unwrap_or_else(|_| "https://api.cloud.llamaindex.ai".to_string()),
        };

        let llm = llm_from_env()?;

        let alert_webhook_url = required("ALERT_WEBHOOK_URL")?;

        Ok(Self {
            bind_addr,
            run_timeout: Duration::from_secs(run_timeout_secs),
            mail_api,
            smtp,
            doc_cloud,
            llm,
            alert_webhook_url,
        })
    }
}

/// Select the LLM backend and credentials from the environment.
///
/// `LLM_BACKEND` is "anthropic" (default) or "openai"; the matching
/// `*_API_KEY` is required. `FIN_TRIAGE_MODEL` overrides the default model.
fn llm_from_env() -> Result<LlmConfig, ConfigError> {
    let backend = match std::env::var("LLM_BACKEND").as_deref() {
        Ok("openai") => LlmBackend::OpenAi,
        Ok("anthropic") | Err(_) => LlmBackend::Anthropic,
        Ok(other) => {
            return Err(ConfigError::InvalidValue {
                key: "LLM_BACKEND".into(),
                message: format!("unknown backend: {other}"),
            });
        }
    };

    let (key_var, default_model) = match backend {
        LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
        LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4.1"),
    };

    Ok(LlmConfig {
        backend,
        api_key: SecretString::from(required(key_var)?),
        model: std::env::var("FIN_TRIAGE_MODEL").unwrap_or_else(|_| default_model.to_string()),
    })
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
