//! Reply drafting — prompt construction and LLM output parsing.

use serde::Deserialize;

use crate::docai::{Expense, Invoice};

/// System prompt for every reply draft. The model must answer with a JSON
/// object so the body survives transport untouched.
pub(crate) const REPLY_SYSTEM_PROMPT: &str =
    "You are an email writer and formatter. Write the email and produce HTML that \
     represents the body.\n\
     Respond with ONLY a JSON object: {\"html\": \"...\"}";

/// User prompt for an expense under the budget limit.
pub(crate) fn expense_accepted_prompt(sender: &str, expense: &Expense, original_body: &str) -> String {
    format!(
        "Construct an email acknowledging to {sender} that their expense of {} {} for {} \
         was accepted and will be reimbursed in the next payment cycle. \
         Keep in mind that {sender} sent you this email: {original_body}",
        expense.amount, expense.currency, expense.description,
    )
}

/// User prompt for an expense at or over the budget limit.
pub(crate) fn expense_denied_prompt(sender: &str, expense: &Expense, original_body: &str) -> String {
    format!(
        "Construct an email to {sender} explaining that their expense of {} {} for {} \
         exceeds the budget and has been denied. Explain that they can reach out if this \
         seems wrong. Keep in mind that {sender} sent you this email: {original_body}",
        expense.amount, expense.currency, expense.description,
    )
}

/// User prompt acknowledging a received invoice.
pub(crate) fn invoice_received_prompt(sender: &str, invoice: &Invoice, original_body: &str) -> String {
    format!(
        "Construct a reply to {sender} confirming that the invoice has been received, \
         naming who will be paid and how much: {} is owed {} {}, due {}. \
         Keep in mind that {sender} sent you this email: {original_body}",
        invoice.payee, invoice.amount, invoice.currency, invoice.due_date,
    )
}

/// The structured reply the LLM must return.
#[derive(Debug, Deserialize)]
struct ReplyBody {
    html: String,
}

/// Parse the LLM's reply into the HTML body.
///
/// Tolerates markdown code fences and surrounding prose around the JSON
/// object; anything that still fails to parse is a reply-generation failure.
pub(crate) fn parse_reply_body(raw: &str) -> Result<String, String> {
    let json_str = extract_json_object(raw);
    let body: ReplyBody =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;
    Ok(body.html)
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
