//! LLM request/response types
//!
//! Shaped after the OpenAI Chat Completions API: one system prompt, a list of
//! role-tagged messages, and sampling parameters chosen per call.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier understood by the endpoint
    pub model: String,

    /// System prompt (rendered from a Handlebars template)
    pub system_prompt: String,

    /// User messages (one per pipeline call)
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token budget for this call; `None` leaves it to the endpoint
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Build a single-turn request: system prompt plus one user message
    pub fn single_turn(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Self {
        let model = model.into();
        debug!(%model, temperature, ?max_tokens, "CompletionRequest::single_turn: called");
        Self {
            model,
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user_prompt)],
            temperature,
            max_tokens,
        }
    }

    /// Text of the first user message, if any
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage for cost tracking
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Plain text response that ended normally
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    /// The raw response text, empty when the model returned no content
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// True when the output budget cut the response short
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ContentFilter,
}

impl StopReason {
    /// Parse from an OpenAI `finish_reason` string
    pub fn from_openai(s: Option<&str>) -> Self {
        debug!(?s, "StopReason::from_openai: called");
        match s {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage for cost tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_turn_request() {
        let req = CompletionRequest::single_turn("writer", "system", "write scene 1", 0.6, Some(5000));
        assert_eq!(req.model, "writer");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.user_prompt(), Some("write scene 1"));
        assert_eq!(req.max_tokens, Some(5000));
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::user("Hello").role, Role::User);
        assert_eq!(Message::assistant("Hi there").role.as_str(), "assistant");
    }

    #[test]
    fn test_stop_reason_from_openai() {
        assert_eq!(StopReason::from_openai(Some("stop")), StopReason::EndTurn);
        assert_eq!(StopReason::from_openai(Some("length")), StopReason::MaxTokens);
        assert_eq!(StopReason::from_openai(Some("content_filter")), StopReason::ContentFilter);
        assert_eq!(StopReason::from_openai(None), StopReason::EndTurn);
    }

    #[test]
    fn test_response_text_defaults_to_empty() {
        let resp = CompletionResponse {
            content: None,
            stop_reason: StopReason::MaxTokens,
            usage: TokenUsage::default(),
        };
        assert_eq!(resp.text(), "");
        assert!(resp.truncated());
        assert_eq!(CompletionResponse::text_only("ok").text(), "ok");
    }
}
