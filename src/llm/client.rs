//! Core LLM client trait, error taxonomy, and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless text-generation client - each call is independent
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model name used when the request does not override it
    fn model(&self) -> &str;

    /// Whether the client has what it needs to make calls
    fn is_ready(&self) -> bool {
        true
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status >= 500 || *status == 408,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => true,
            LlmError::MissingApiKey { .. } => false,
        }
    }

    /// Map a non-success HTTP status onto the taxonomy
    pub fn from_status(status: u16, retry_after_secs: Option<u64>, body: String) -> Self {
        if status == 429 {
            return LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after_secs.unwrap_or(60)),
            };
        }
        LlmError::Api { status, message: body }
    }

    /// Map a transport error, keeping timeouts distinct
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Scripted client for tests and dry runs.
///
/// Replies are consumed in order; once the script is empty the optional
/// fallback reply is repeated. Every request is recorded.
pub struct MockLlmClient {
    model: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<Result<String, LlmError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers with each text in order
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in responses {
            client.push_response(r);
        }
        client
    }

    /// Client that fails every call with the same error
    pub fn failing(err: LlmError) -> Self {
        Self::new().with_fallback(Err(err))
    }

    pub fn with_fallback(mut self, reply: Result<String, LlmError>) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(text.into()));
    }

    pub fn push_error(&self, err: LlmError) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(err));
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Copies of every request received
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let reply = match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| Err(LlmError::InvalidResponse("mock script exhausted".to_string()))),
        };

        reply.map(|text| CompletionResponse::text(text, self.model.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
