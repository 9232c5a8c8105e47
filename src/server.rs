//! Webhook ingress — receives `email.received` events and spawns pipeline runs.
//!
//! The provider calls `POST /webhook` once per inbound email. The handler
//! answers immediately (204) and runs the pipeline in a detached task bounded
//! by the run-level timeout; a slow run never blocks the provider's delivery
//! retries.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::pipeline::{EmailReceived, TriagePipeline};

/// Webhook requests allowed per second (burst 1).
const WEBHOOK_RATE_PER_SEC: f64 = 1.0;

// ── Ingress payload ─────────────────────────────────────────────────

/// The provider's `email.received` webhook event.
#[derive(Debug, Deserialize)]
pub struct EmailReceivedEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub data: EmailData,
}

/// The email reference inside a webhook event.
#[derive(Debug, Deserialize)]
pub struct EmailData {
    pub email_id: String,
    pub from: String,
    #[serde(default)]
    pub subject: String,
}

impl EmailData {
    fn into_event(self) -> EmailReceived {
        EmailReceived {
            sender: self.from,
            subject: self.subject,
            email_id: self.email_id,
        }
    }
}

// ── Rate limiting ───────────────────────────────────────────────────

/// Token-bucket limiter: `rate` tokens/second up to `burst` capacity.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    rate: f64,
    burst: f64,
}

struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last: Instant::now(),
            }),
            rate,
            burst,
        }
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last).as_secs_f64();
        bucket.last = now;
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TriagePipeline>,
    pub limiter: Arc<RateLimiter>,
    pub run_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: Arc<TriagePipeline>, run_timeout: Duration) -> Self {
        Self {
            pipeline,
            limiter: Arc::new(RateLimiter::new(WEBHOOK_RATE_PER_SEC, 1.0)),
            run_timeout,
        }
    }
}

/// Build the Axum router for the ingress.
pub fn webhook_routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_email))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fin-triage"
    }))
}

async fn receive_email(State(state): State<AppState>, body: Bytes) -> StatusCode {
    if !state.limiter.allow() {
        warn!("Too many requests, bounced");
        return StatusCode::TOO_MANY_REQUESTS;
    }

    let event: EmailReceivedEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Failed to decode incoming request body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let received = event.data.into_event();
    info!(
        event_type = %event.event_type,
        email_id = %received.email_id,
        sender = %received.sender,
        "Email received"
    );

    let pipeline = state.pipeline.clone();
    let timeout = state.run_timeout;
    tokio::spawn(async move {
        let email_id = received.email_id.clone();
        match tokio::time::timeout(timeout, pipeline.run(received)).await {
            Ok(Ok(output)) => {
                info!(email_id = %email_id, success = output.success, "Run completed");
            }
            Ok(Err(e)) => {
                error!(email_id = %email_id, error = %e, "Run aborted");
            }
            Err(_) => {
                warn!(
                    email_id = %email_id,
                    timeout_secs = timeout.as_secs(),
                    "Run timed out and was abandoned"
                );
            }
        }
    });

    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use crate::alert::AlertSink;
    use crate::docai::{
        ClassifiedItem, Classifier, ClassifierRule, Extraction, ExtractionSchema, Extractor,
    };
    use crate::error::{AlertError, DeliveryError, DocError, LlmError, MailError};
    use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};
    use crate::mail::{
        AttachmentMeta, Download, EmailContent, Mailbox, OutgoingReply, ReplyMailer,
    };
    use crate::pipeline::ReplyIdentity;

    // No-op collaborators: ingress tests only care about HTTP semantics.

    struct NullMailbox;

    #[async_trait::async_trait]
    impl Mailbox for NullMailbox {
        async fn attachments(&self, _: &str) -> Result<Vec<AttachmentMeta>, MailError> {
            Ok(vec![])
        }
        async fn body(&self, _: &str) -> Result<EmailContent, MailError> {
            Ok(EmailContent::default())
        }
        async fn download(&self, _: &str) -> Result<Download, MailError> {
            Ok(Download {
                status: 200,
                bytes: vec![],
            })
        }
    }

    struct NullClassifier;

    #[async_trait::async_trait]
    impl Classifier for NullClassifier {
        async fn classify(
            &self,
            _: &Path,
            _: &[ClassifierRule],
        ) -> Result<Vec<ClassifiedItem>, DocError> {
            Ok(vec![])
        }
    }

    struct NullExtractor;

    #[async_trait::async_trait]
    impl Extractor for NullExtractor {
        async fn extract(&self, _: ExtractionSchema, _: &Path) -> Result<Extraction, DocError> {
            Ok(Extraction { data: None })
        }
    }

    struct NullLlm;

    #[async_trait::async_trait]
    impl LlmProvider for NullLlm {
        fn model_name(&self) -> &str {
            "null"
        }
        async fn complete(&self, _: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: r#"{"html": "<p>ok</p>"}"#.into(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    struct NullMailer;

    #[async_trait::async_trait]
    impl ReplyMailer for NullMailer {
        async fn send(&self, _: &OutgoingReply) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    struct NullAlerts;

    #[async_trait::async_trait]
    impl AlertSink for NullAlerts {
        async fn notify(&self, _: &str) -> Result<(), AlertError> {
            Ok(())
        }
    }

    fn app() -> Router {
        let pipeline = Arc::new(TriagePipeline::new(
            Arc::new(NullMailbox),
            Arc::new(NullClassifier),
            Arc::new(NullExtractor),
            Arc::new(NullLlm),
            Arc::new(NullMailer),
            Arc::new(NullAlerts),
            ReplyIdentity {
                from: "finance@test.com".into(),
                reply_to: "finance@test.com".into(),
            },
        ));
        webhook_routes(AppState::new(pipeline, Duration::from_secs(5)))
    }

    fn webhook_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const VALID_EVENT: &str = r#"{
        "type": "email.received",
        "created_at": "2026-08-07T10:00:00Z",
        "data": {
            "email_id": "em_1",
            "from": "alice@example.com",
            "subject": "Expense report"
        }
    }"#;

    // ── Rate limiter ────────────────────────────────────────────────

    #[test]
    fn limiter_allows_burst_then_denies() {
        let limiter = RateLimiter::new(1.0, 2.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn limiter_refills_over_time() {
        let limiter = RateLimiter::new(1000.0, 1.0);
        assert!(limiter.allow());
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.allow());
    }

    // ── Handlers ────────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_event_is_accepted() {
        let response = app().oneshot(webhook_request(VALID_EVENT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let response = app().oneshot(webhook_request("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_required_fields_rejected() {
        let response = app()
            .oneshot(webhook_request(r#"{"type": "email.received", "data": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_request_in_same_second_is_bounced() {
        let app = app();
        let first = app
            .clone()
            .oneshot(webhook_request(VALID_EVENT))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::NO_CONTENT);

        let second = app.oneshot(webhook_request(VALID_EVENT)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
