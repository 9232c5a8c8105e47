//! Bridge from rig-core's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{CompletionModel, CompletionRequestBuilder, Message};
use rig::message::AssistantContent;

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};
use crate::error::LlmError;

/// Adapter wrapping any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

/// Split our message list into rig's shape: system messages concatenate into
/// the preamble, the last user message is the prompt, everything in between is
/// chat history.
fn split_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<Message>, Option<Message>) {
    let mut preamble_parts = Vec::new();
    let mut history = Vec::new();

    for message in messages {
        match message.role {
            Role::System => preamble_parts.push(message.content),
            Role::User => history.push(Message::user(message.content)),
            Role::Assistant => history.push(Message::assistant(message.content)),
        }
    }

    let prompt = history.pop();
    let preamble = if preamble_parts.is_empty() {
        None
    } else {
        Some(preamble_parts.join("\n\n"))
    };
    (preamble, history, prompt)
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, history, prompt) = split_messages(request.messages);
        let prompt = prompt.ok_or_else(|| LlmError::InvalidResponse {
            provider: self.model_name.clone(),
            reason: "completion request has no user message".to_string(),
        })?;

        let mut builder = CompletionRequestBuilder::new(self.model.clone(), prompt);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        builder = builder.messages(history);
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let content: String = response
            .choice
            .into_iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_puts_system_in_preamble_and_last_user_as_prompt() {
        let (preamble, history, prompt) = split_messages(vec![
            ChatMessage::system("write emails"),
            ChatMessage::user("draft the reply"),
        ]);
        assert_eq!(preamble.as_deref(), Some("write emails"));
        assert!(history.is_empty());
        assert!(prompt.is_some());
    }

    #[test]
    fn split_joins_multiple_system_messages() {
        let (preamble, _, _) = split_messages(vec![
            ChatMessage::system("a"),
            ChatMessage::system("b"),
            ChatMessage::user("go"),
        ]);
        assert_eq!(preamble.as_deref(), Some("a\n\nb"));
    }

    #[test]
    fn split_with_no_user_message_yields_no_prompt() {
        let (_, history, prompt) = split_messages(vec![ChatMessage::system("only system")]);
        assert!(history.is_empty());
        assert!(prompt.is_none());
    }
}
