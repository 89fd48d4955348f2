//! Generation strategies - core interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{Candidate, ContentRequest};
use crate::error::Result;
use crate::llm::LlmError;

/// Why a strategy produced no candidate
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Text-generation service failed after its retry budget
    #[error("generation service error: {0}")]
    Llm(#[from] LlmError),

    /// Prompt could not be rendered for this request
    #[error("prompt error: {0}")]
    Prompt(String),

    /// Service answered but nothing usable came back
    #[error("unusable output: {0}")]
    Unusable(String),

    /// Every strategy in a chain failed
    #[error("all strategies failed: {}", attempts.join("; "))]
    AllFailed {
        attempts: Vec<String>,
        rate_limited: bool,
        /// Every attempt ended in a service timeout
        timed_out: bool,
    },
}

impl GenerationError {
    /// Rate limiting was (at least part of) the cause
    pub fn is_rate_limit(&self) -> bool {
        match self {
            GenerationError::Llm(e) => e.is_rate_limit(),
            GenerationError::AllFailed { rate_limited, .. } => *rate_limited,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            GenerationError::Llm(e) => e.is_timeout(),
            GenerationError::AllFailed { timed_out, .. } => *timed_out,
            _ => false,
        }
    }
}

/// One way of turning a request into a candidate
#[async_trait]
pub trait GenerationStrategy: Send + Sync {
    /// Stable name recorded on every candidate
    fn name(&self) -> &str;

    /// Reject requests this strategy can never serve, before any call is made
    fn validate(&self, _request: &ContentRequest) -> Result<()> {
        Ok(())
    }

    /// Produce the candidate for `round`, honoring `revision` instructions
    /// from the previous round when present
    async fn generate(
        &self,
        request: &ContentRequest,
        revision: Option<&str>,
        round: u32,
    ) -> std::result::Result<Candidate, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_limit_classification() {
        let err = GenerationError::from(LlmError::RateLimited {
            retry_after: Duration::from_secs(1),
        });
        assert!(err.is_rate_limit());
        assert!(!err.is_timeout());

        let all = GenerationError::AllFailed {
            attempts: vec!["a: x".to_string(), "b: y".to_string()],
            rate_limited: true,
            timed_out: false,
        };
        assert!(all.is_rate_limit());
        assert_eq!(all.to_string(), "all strategies failed: a: x; b: y");
    }

    #[test]
    fn test_timeout_classification() {
        let err = GenerationError::from(LlmError::Timeout(Duration::from_secs(5)));
        assert!(err.is_timeout());
        assert!(!GenerationError::Unusable("empty".to_string()).is_timeout());

        let all = GenerationError::AllFailed {
            attempts: vec!["single_pass: timed out".to_string()],
            rate_limited: false,
            timed_out: true,
        };
        assert!(all.is_timeout());
    }
}
