//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent (fresh context)
///
/// Every pipeline step sends its full context in one request; nothing is
/// carried between calls except what the caller puts in the prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    ///
    /// Transport and HTTP failures come back as `LlmError` without any
    /// retry; retry policy belongs to the caller.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted responses in order and records every request.
    pub struct MockLlmClient {
        responses: Vec<Result<String, u16>>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<String>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::scripted(responses.into_iter().map(Ok).collect())
        }

        /// `Err(status)` entries answer with an API error of that status
        pub fn scripted(responses: Vec<Result<String, u16>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, model = %request.model, "MockLlmClient::complete: called");
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            match self.responses.get(idx) {
                Some(Ok(text)) => Ok(CompletionResponse::text_only(text.clone())),
                Some(Err(status)) => Err(LlmError::ApiError {
                    status: *status,
                    message: "mock error".to_string(),
                }),
                None => {
                    debug!("MockLlmClient::complete: no more mock responses");
                    Err(LlmError::InvalidResponse("No more mock responses".to_string()))
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec!["Response 1".to_string(), "Response 2".to_string()]);
            let req = CompletionRequest::single_turn("m", "Test", "hi", 0.2, Some(1000));

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.text(), "Response 1");

            let resp2 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp2.text(), "Response 2");

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let req = CompletionRequest::single_turn("m", "Test", "hi", 0.2, Some(1000));
            assert!(client.complete(req).await.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_scripted_api_error() {
            let client = MockLlmClient::scripted(vec![Err(502)]);
            let req = CompletionRequest::single_turn("m", "Test", "hi", 0.2, Some(1000));
            let err = client.complete(req).await.unwrap_err();
            assert_eq!(err.status(), Some(502));
        }
    }
}
