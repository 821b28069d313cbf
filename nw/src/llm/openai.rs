//! OpenAI-compatible API client implementation
//!
//! Implements the LlmClient trait for the Chat Completions API. Each call is a
//! single blocking POST; there is no streaming and no transport retry.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::{LlmConfig, TokenParam};

/// Browser-like agent; some gateway WAFs reject library user agents
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// OpenAI-compatible API client
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http: Client,
    token_param: TokenParam,
    timeout: Duration,
}

impl OpenAIClient {
    /// Create a new client from the `llm` config section
    ///
    /// Fails with `MissingApiKey` when neither the configured key variable nor
    /// its fallback is set.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let api_key = config
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_millis(config.timeout_ms),
            config.token_param,
        )
    }

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        token_param: TokenParam,
    ) -> Result<Self, LlmError> {
        debug!(%base_url, ?timeout, ?token_param, "new: called");
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token_param,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Build the request body for the Chat Completions API
    ///
    /// The token budget goes under exactly one parameter name; some gateways
    /// reject requests that set both.
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(model = %request.model, ?request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body[self.token_param.as_str()] = serde_json::json!(max_tokens);
        } else {
            debug!("build_request_body: no token budget");
        }

        body
    }

    /// Parse the API response
    ///
    /// A response without choices or without message content yields the raw
    /// body as its text, so whatever the gateway said ends up in the debug
    /// artifacts instead of an empty string.
    fn parse_response(&self, api_response: OpenAIResponse, body: &str) -> CompletionResponse {
        debug!(choice_count = %api_response.choices.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.choices.into_iter().next() {
            Some(c) => (c.message.content, StopReason::from_openai(c.finish_reason.as_deref())),
            None => {
                warn!("parse_response: response had no choices");
                (None, StopReason::EndTurn)
            }
        };
        let content = content.or_else(|| {
            warn!("parse_response: no message content, using the response body");
            Some(body.to_string())
        });

        let usage = api_response.usage.unwrap_or_default();
        CompletionResponse {
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            debug!("map_send_error: timeout");
            LlmError::Timeout(self.timeout)
        } else {
            debug!(error = %e, "map_send_error: network error");
            LlmError::Network(e)
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, ?request.max_tokens, "complete: called");
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, "complete: API error");
            return Err(LlmError::ApiError { status, message });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let api_response: OpenAIResponse = serde_json::from_str(&text)?;
        let response = self.parse_response(api_response, &text);
        debug!(
            input_tokens = %response.usage.input_tokens,
            output_tokens = %response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "complete: success"
        );
        Ok(response)
    }
}

// Chat Completions response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
