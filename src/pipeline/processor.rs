//! The four-stage triage pipeline.
//!
//! Flow:
//! 1. Intake — fetch body + first attachment, validate, store scratch file
//! 2. Classification — "invoice" or "expense", fixed rule set
//! 3. Extraction & decision — schema extract, budget rule, reply draft
//! 4. Dispatch — reply email on success, webhook alert on failure
//!
//! Control only moves forward; each stage's outcome type decides the next
//! step. Stages fold their known failure modes into the failure send-event;
//! collaborator exceptions propagate and abort the run.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::docai::{
    Classifier, ClassifierRule, Expense, ExtractionSchema, Extractor, Invoice,
};
use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::mail::{Mailbox, OutgoingReply, ReplyMailer};
use crate::pipeline::events::{
    ClassificationResult, ClassifyOutcome, EmailProcessed, EmailReceived, IntakeOutcome,
    OutputEvent, SendEmail,
};
use crate::pipeline::reply::{
    REPLY_SYSTEM_PROMPT, expense_accepted_prompt, expense_denied_prompt, invoice_received_prompt,
    parse_reply_body,
};
use crate::pipeline::state::{RunState, ScratchFile};

/// Attachment content types the intake stage accepts.
const SUPPORTED_CONTENT_TYPES: [&str; 3] = ["application/pdf", "image/png", "image/jpg"];

/// Expenses strictly below this amount are reimbursed without review.
const EXPENSE_BUDGET_LIMIT: f64 = 1000.0;

/// Temperature for reply drafting (stays close to the template).
const REPLY_TEMPERATURE: f32 = 0.3;

/// Max tokens for one reply draft.
const REPLY_MAX_TOKENS: u32 = 1024;

const ERR_NO_ATTACHMENT: &str = "The email does not contain an attachment";
const ERR_UNSUPPORTED_TYPE: &str = "The attachment must be a PDF file or a PNG/JPEG image";
const ERR_DOWNLOAD: &str = "An error occurred while downloading the attachment";
const ERR_CLASSIFY: &str = "It was not possible to classify your documents";
const ERR_EXTRACT: &str = "There was an error while extracting data for the email";
const ERR_REPLY: &str = "There was an error while generating the reply email";

/// Addresses stamped on every outgoing reply.
#[derive(Debug, Clone)]
pub struct ReplyIdentity {
    pub from: String,
    pub reply_to: String,
}

/// The triage pipeline. One instance serves all runs; per-run state lives in
/// [`RunState`], so concurrent runs never share mutable state.
pub struct TriagePipeline {
    mailbox: Arc<dyn Mailbox>,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn Extractor>,
    llm: Arc<dyn LlmProvider>,
    mailer: Arc<dyn ReplyMailer>,
    alerts: Arc<dyn AlertSink>,
    identity: ReplyIdentity,
}

impl TriagePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn Extractor>,
        llm: Arc<dyn LlmProvider>,
        mailer: Arc<dyn ReplyMailer>,
        alerts: Arc<dyn AlertSink>,
        identity: ReplyIdentity,
    ) -> Self {
        Self {
            mailbox,
            classifier,
            extractor,
            llm,
            mailer,
            alerts,
            identity,
        }
    }

    /// Drive one email through all four stages to its terminal event.
    pub async fn run(&self, event: EmailReceived) -> Result<OutputEvent, PipelineError> {
        let email_id = event.email_id.clone();
        info!(email_id = %email_id, sender = %event.sender, "Pipeline run started");

        let mut state = RunState::default();

        let send = match self.intake(event, &mut state).await? {
            IntakeOutcome::Rejected(send) => send,
            IntakeOutcome::Processed(processed) => match self.classify(processed).await? {
                ClassifyOutcome::Rejected(send) => send,
                ClassifyOutcome::Classified(result) => {
                    self.extract_and_decide(result, &mut state).await?
                }
            },
        };

        // The extraction stage owns cleanup; this covers the rejection paths
        // that never reach it. Idempotent.
        state.discard_scratch();

        let output = self.dispatch(send, &state).await?;
        info!(email_id = %email_id, success = output.success, "Pipeline run finished");
        Ok(output)
    }

    // ── Stage 1: intake ─────────────────────────────────────────────

    async fn intake(
        &self,
        event: EmailReceived,
        state: &mut RunState,
    ) -> Result<IntakeOutcome, PipelineError> {
        let attachments = self.mailbox.attachments(&event.email_id).await?;
        let content = self.mailbox.body(&event.email_id).await?;

        state.sender = event.sender;
        state.subject = event.subject;
        state.body = content.html.unwrap_or_else(|| "No body".to_string());

        let Some(attachment) = attachments.first() else {
            warn!(email_id = %event.email_id, "Email has no attachment");
            return Ok(IntakeOutcome::Rejected(SendEmail::failure(ERR_NO_ATTACHMENT)));
        };

        if !SUPPORTED_CONTENT_TYPES.contains(&attachment.content_type.as_str()) {
            warn!(
                email_id = %event.email_id,
                content_type = %attachment.content_type,
                "Unsupported attachment type"
            );
            return Ok(IntakeOutcome::Rejected(SendEmail::failure(ERR_UNSUPPORTED_TYPE)));
        }

        let download = self.mailbox.download(&attachment.download_url).await?;
        if download.status != 200 {
            warn!(status = download.status, "Attachment download failed");
            return Ok(IntakeOutcome::Rejected(SendEmail::failure(ERR_DOWNLOAD)));
        }

        let suffix = attachment
            .content_type
            .split('/')
            .nth(1)
            .unwrap_or("bin");
        let scratch = ScratchFile::write(&download.bytes, suffix).await?;
        let attachment_file_path = scratch.path().to_path_buf();
        state.set_scratch(scratch);

        info!(path = %attachment_file_path.display(), "Attachment stored");
        Ok(IntakeOutcome::Processed(EmailProcessed {
            attachment_file_path,
        }))
    }

    // ── Stage 2: classification ─────────────────────────────────────

    async fn classify(&self, event: EmailProcessed) -> Result<ClassifyOutcome, PipelineError> {
        let rules = classification_rules();
        let items = self
            .classifier
            .classify(&event.attachment_file_path, &rules)
            .await?;

        match items.into_iter().next().and_then(|item| item.result) {
            Some(outcome) => {
                info!(label = %outcome.label, "Document classified");
                Ok(ClassifyOutcome::Classified(ClassificationResult {
                    classification: outcome.label,
                    reason: outcome.reasoning,
                }))
            }
            None => {
                warn!("Classifier returned no result");
                Ok(ClassifyOutcome::Rejected(SendEmail::failure(ERR_CLASSIFY)))
            }
        }
    }

    // ── Stage 3: extraction & decision ──────────────────────────────

    async fn extract_and_decide(
        &self,
        event: ClassificationResult,
        state: &mut RunState,
    ) -> Result<SendEmail, PipelineError> {
        let Some(file) = state.scratch_path().map(Path::to_path_buf) else {
            // Unreachable through the runner; still resolves to a terminal event.
            return Ok(SendEmail::failure(ERR_EXTRACT));
        };

        let send = match event.classification.as_str() {
            "expense" => {
                let extraction = self
                    .extractor
                    .extract(ExtractionSchema::Expense, &file)
                    .await?;
                match decode_record::<Expense>(extraction.data) {
                    Some(expense) => {
                        let prompt = if expense.amount < EXPENSE_BUDGET_LIMIT {
                            info!(amount = expense.amount, "Expense accepted");
                            expense_accepted_prompt(&state.sender, &expense, &state.body)
                        } else {
                            info!(amount = expense.amount, "Expense denied");
                            expense_denied_prompt(&state.sender, &expense, &state.body)
                        };
                        self.draft_reply(prompt).await?
                    }
                    None => SendEmail::failure(ERR_EXTRACT),
                }
            }
            "invoice" => {
                let extraction = self
                    .extractor
                    .extract(ExtractionSchema::Invoice, &file)
                    .await?;
                match decode_record::<Invoice>(extraction.data) {
                    Some(invoice) => {
                        info!(payee = %invoice.payee, "Invoice received");
                        let prompt =
                            invoice_received_prompt(&state.sender, &invoice, &state.body);
                        self.draft_reply(prompt).await?
                    }
                    None => SendEmail::failure(ERR_EXTRACT),
                }
            }
            other => {
                warn!(label = other, "Classifier returned an unknown label");
                SendEmail::failure(ERR_EXTRACT)
            }
        };

        state.discard_scratch();
        Ok(send)
    }

    /// Ask the LLM for the reply body; a draft that does not parse becomes the
    /// reply-generation failure event.
    async fn draft_reply(&self, user_prompt: String) -> Result<SendEmail, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(REPLY_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(REPLY_TEMPERATURE)
        .with_max_tokens(REPLY_MAX_TOKENS);

        let response = self.llm.complete(request).await?;

        match parse_reply_body(&response.content) {
            Ok(html) => Ok(SendEmail::reply(html)),
            Err(e) => {
                warn!(error = %e, raw = %response.content, "Reply draft did not parse");
                Ok(SendEmail::failure(ERR_REPLY))
            }
        }
    }

    // ── Stage 4: dispatch ───────────────────────────────────────────

    async fn dispatch(
        &self,
        event: SendEmail,
        state: &RunState,
    ) -> Result<OutputEvent, PipelineError> {
        match event {
            SendEmail::Reply { body } => {
                let reply = OutgoingReply {
                    from: self.identity.from.clone(),
                    to: state.sender.clone(),
                    subject: format!("Re: {}", state.subject),
                    html: body,
                    reply_to: self.identity.reply_to.clone(),
                };
                self.mailer.send(&reply).await?;
                info!(to = %reply.to, "Reply delivered");
                Ok(OutputEvent { success: true })
            }
            SendEmail::Failure { error } => {
                self.alerts.notify(&error).await?;
                warn!(error = %error, "Run ended in alert");
                Ok(OutputEvent { success: false })
            }
        }
    }
}

/// The two fixed categories every document is classified against.
fn classification_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new(
            "invoice",
            "An invoice for a contract that has to be paid out by the company. \
             It may be forwarded by a partner or an employee.",
        ),
        ClassifierRule::new(
            "expense",
            "An expense submitted for a business trip that should be paid back \
             to the employee in the next payout cycle.",
        ),
    ]
}

/// Deserialize an extraction mapping; a missing or malformed mapping counts
/// as "no data".
fn decode_record<T: serde::de::DeserializeOwned>(data: Option<serde_json::Value>) -> Option<T> {
    data.and_then(|value| serde_json::from_value(value).ok())
}
