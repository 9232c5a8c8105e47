//! Document intelligence collaborators — classification and extraction.

pub mod client;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocError;

pub use client::CloudDocClient;

/// One category the classifier may assign.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierRule {
    pub label: String,
    pub description: String,
}

impl ClassifierRule {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// The classifier's verdict for one document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClassOutcome {
    pub label: String,
    pub reasoning: String,
}

/// One item of a classification response; `result` is absent when the
/// classifier could not assign any rule.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifiedItem {
    pub result: Option<ClassOutcome>,
}

/// Document classification against a fixed rule set.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        file: &Path,
        rules: &[ClassifierRule],
    ) -> Result<Vec<ClassifiedItem>, DocError>;
}

/// Which structured record shape to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSchema {
    Invoice,
    Expense,
}

impl ExtractionSchema {
    /// Wire name of the schema.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Expense => "expense",
        }
    }
}

/// Raw extraction result; `data` is absent when the extractor found nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct Extraction {
    pub data: Option<serde_json::Value>,
}

/// Structured-data extraction from a stored document.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        schema: ExtractionSchema,
        file: &Path,
    ) -> Result<Extraction, DocError>;
}

// ── Extracted record shapes ─────────────────────────────────────────

/// A supplier invoice payable by the company.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Invoice {
    pub amount: f64,
    pub currency: String,
    pub due_date: String,
    pub payee: String,
}

/// An employee expense reimbursable in the next payout cycle.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Expense {
    pub amount: f64,
    pub currency: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_deserializes_from_extraction_data() {
        let expense: Expense = serde_json::from_value(serde_json::json!({
            "amount": 200.0,
            "currency": "USD",
            "description": "taxi",
        }))
        .unwrap();
        assert_eq!(expense.amount, 200.0);
        assert_eq!(expense.description, "taxi");
    }

    #[test]
    fn invoice_deserializes_from_extraction_data() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({
            "amount": 1250.50,
            "currency": "EUR",
            "due_date": "2026-09-01",
            "payee": "Acme GmbH",
        }))
        .unwrap();
        assert_eq!(invoice.payee, "Acme GmbH");
    }

    #[test]
    fn incomplete_mapping_fails_to_deserialize() {
        let result = serde_json::from_value::<Expense>(serde_json::json!({"amount": 10.0}));
        assert!(result.is_err());
    }

    #[test]
    fn classified_item_with_null_result() {
        let item: ClassifiedItem = serde_json::from_str(r#"{"result": null}"#).unwrap();
        assert!(item.result.is_none());
    }

    #[test]
    fn schema_wire_names() {
        assert_eq!(ExtractionSchema::Invoice.name(), "invoice");
        assert_eq!(ExtractionSchema::Expense.name(), "expense");
    }
}
