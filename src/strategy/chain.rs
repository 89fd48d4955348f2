//! Ordered fallback over generation strategies.

use std::sync::Arc;

use log::warn;

use crate::content::{Candidate, ContentRequest};
use crate::error::{PostforgeError, Result};
use crate::strategy::traits::{GenerationError, GenerationStrategy};

/// Tries each strategy in order; the first candidate wins
#[derive(Clone)]
pub struct StrategyChain {
    strategies: Vec<Arc<dyn GenerationStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn GenerationStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn single(strategy: Arc<dyn GenerationStrategy>) -> Self {
        Self::new(vec![strategy])
    }

    pub fn push(&mut self, strategy: Arc<dyn GenerationStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Every strategy must accept the request
    pub fn validate(&self, request: &ContentRequest) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(PostforgeError::invalid("no generation strategies configured"));
        }
        for strategy in &self.strategies {
            strategy.validate(request)?;
        }
        Ok(())
    }

    pub async fn generate(
        &self,
        request: &ContentRequest,
        revision: Option<&str>,
        round: u32,
    ) -> std::result::Result<Candidate, GenerationError> {
        let mut attempts = Vec::new();
        let mut rate_limited = false;
        let mut timed_out = true;

        for strategy in &self.strategies {
            match strategy.generate(request, revision, round).await {
                Ok(candidate) => return Ok(candidate),
                Err(err) => {
                    warn!(
                        "{} {} round {}: strategy {} failed: {}",
                        request.platform(),
                        request.ticker(),
                        round,
                        strategy.name(),
                        err
                    );
                    rate_limited |= err.is_rate_limit();
                    timed_out &= err.is_timeout();
                    attempts.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }

        Err(GenerationError::AllFailed {
            attempts,
            rate_limited,
            timed_out: timed_out && !self.strategies.is_empty(),
        })
    }
}
