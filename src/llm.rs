//! Completion client abstraction
//!
//! The conversation engine talks to a text-generation backend through the
//! [`CompletionClient`] trait: an ordered list of role-tagged messages goes
//! in, one text reply comes out.

mod config;
mod error;
mod openai;
mod types;

pub use config::LlmConfig;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiClient;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion backends
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce one reply for the given ordered messages
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier, used for logging
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion clients
pub struct LoggingClient {
    inner: Arc<dyn CompletionClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn CompletionClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionClient for LoggingClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Client used when no credential is configured; every request fails
pub struct UnconfiguredClient {
    model_id: String,
}

impl UnconfiguredClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for UnconfiguredClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::auth("No completion API key configured"))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_always_fails_with_auth() {
        let client = LoggingClient::new(Arc::new(UnconfiguredClient::new("none")));
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);

        let err = client.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert_eq!(client.model_id(), "none");
    }
}
