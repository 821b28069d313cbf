//! Model gateway
//!
//! A stateless chat-completion client behind the `LlmClient` trait. The
//! pipeline only ever sees raw response text; parsing happens upstream.

mod client;
mod error;
mod openai;
mod types;

use std::sync::Arc;

use tracing::debug;

use crate::config::LlmConfig;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

#[cfg(test)]
pub use client::mock::MockLlmClient;

/// Create the gateway client the pipeline stages share
///
/// Every endpoint is spoken to as an OpenAI-compatible chat-completions API;
/// `llm.base-url` picks the gateway.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OpenAIClient::from_config(config)?))
}
