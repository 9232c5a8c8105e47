//! The email triage pipeline.
//!
//! Every triggering email flows through four stages:
//! 1. Intake — fetch body + first attachment, validate, store a scratch file
//! 2. Classification — "invoice" or "expense"
//! 3. Extraction & decision — schema extraction, budget rule, reply draft
//! 4. Dispatch — reply email (success) or webhook alert (failure)
//!
//! Stage outputs are typed events; the runner in `processor` matches on them
//! to pick the next stage. One run owns its `RunState` and scratch file
//! exclusively, so concurrent runs need no locking.

pub mod events;
pub mod processor;
pub mod reply;
pub mod state;

pub use events::{
    ClassificationResult, ClassifyOutcome, EmailProcessed, EmailReceived, IntakeOutcome,
    OutputEvent, SendEmail,
};
pub use processor::{ReplyIdentity, TriagePipeline};
pub use state::{RunState, ScratchFile};
