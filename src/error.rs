//! Error types for fin-triage.

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail-retrieval and attachment-download errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail API request failed: {0}")]
    Request(String),

    #[error("Failed to decode mail API response: {0}")]
    Decode(String),
}

/// Document classification/extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Document API request failed: {0}")]
    Request(String),

    #[error("Failed to decode document API response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP transport failed: {0}")]
    Transport(String),
}

/// Alert webhook errors.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Alert webhook request failed: {0}")]
    Request(String),
}

/// Errors that abort a single pipeline run.
///
/// Known failure modes (bad attachment type, empty classification result,
/// malformed LLM reply) never surface here — stages fold those into the
/// failure send-event instead. This enum is the collaborator-exception path.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Document error: {0}")]
    Doc(#[from] DocError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
