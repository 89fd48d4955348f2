//! Model-based quality evaluation.
//!
//! A second text-generation call scores the candidate against the request's
//! rubric. Its output is untrusted: anything that does not parse into a full
//! score is re-asked within a small budget, then reported as `Malformed`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::content::{Candidate, ContentRequest};
use crate::evaluator::score::{QualityScore, parse_score};
use crate::llm::{CompletionRequest, LlmClient, LlmError, ResponseFormat, RetryPolicy, complete_with_retry};

/// Errors from the evaluator
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("evaluator service error: {0}")]
    Llm(#[from] LlmError),

    #[error("evaluator output unusable: {0}")]
    Malformed(String),
}

impl EvalError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, EvalError::Llm(e) if e.is_rate_limit())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EvalError::Llm(e) if e.is_timeout())
    }

    /// The service failed, as opposed to returning an unusable verdict
    pub fn is_service_error(&self) -> bool {
        matches!(self, EvalError::Llm(_))
    }
}

/// Scores one candidate against its request's rubric
#[async_trait]
pub trait QualityEvaluator: Send + Sync {
    async fn score(&self, candidate: &Candidate, request: &ContentRequest) -> Result<QualityScore, EvalError>;
}

const SYSTEM_PROMPT: &str = "You are a content compliance reviewer for a financial research marketing team. \
The content is derived from proprietary research reports; treat its numbers as correct unless they \
contradict the supplied source. Return only JSON.";

/// Evaluator backed by a text-generation client
pub struct LlmEvaluator {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    /// Extra calls when the output is malformed
    reparse_budget: u32,
    max_tokens: u32,
    model: Option<String>,
}

impl LlmEvaluator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            reparse_budget: 1,
            max_tokens: 1_024,
            model: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reparse_budget(mut self, budget: u32) -> Self {
        self.reparse_budget = budget;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn build_request(&self, candidate: &Candidate, request: &ContentRequest) -> CompletionRequest {
        let prompt = request
            .rubric()
            .build_prompt(request.platform().as_str(), request.ticker(), candidate.as_text());
        let mut completion = CompletionRequest::new(SYSTEM_PROMPT)
            .with_user_message(prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::Json);
        if let Some(model) = &self.model {
            completion = completion.with_model(model.clone());
        }
        completion
    }
}

#[async_trait]
impl QualityEvaluator for LlmEvaluator {
    async fn score(&self, candidate: &Candidate, request: &ContentRequest) -> Result<QualityScore, EvalError> {
        let start = Instant::now();
        let completion = self.build_request(candidate, request);
        let attempts = self.reparse_budget + 1;
        let mut last_problem = String::new();

        for attempt in 1..=attempts {
            let response = complete_with_retry(self.client.as_ref(), &completion, &self.retry).await?;
            match parse_score(&response.content, request.rubric()) {
                Ok(score) => {
                    debug!(
                        "evaluator scored round {} at {:.2} ({} hard fails) in {:?}",
                        candidate.round(),
                        score.weighted,
                        score.hard_fails.len(),
                        start.elapsed()
                    );
                    return Ok(score);
                }
                Err(problem) => {
                    warn!("evaluator output malformed (attempt {}/{}): {}", attempt, attempts, problem);
                    last_problem = problem;
                }
            }
        }

        Err(EvalError::Malformed(last_problem))
    }
}
