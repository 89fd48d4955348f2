//! Evaluator with scripted verdicts, for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::content::{Candidate, ContentRequest};
use crate::evaluator::judge::{EvalError, QualityEvaluator};
use crate::evaluator::score::QualityScore;

/// Returns queued verdicts in order, then the fallback (if any).
/// Records the round of every candidate it was asked to score.
pub struct ScriptedEvaluator {
    script: Mutex<VecDeque<Result<QualityScore, EvalError>>>,
    fallback: Option<Result<QualityScore, EvalError>>,
    scored_rounds: Mutex<Vec<u32>>,
}

impl ScriptedEvaluator {
    pub fn new<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Result<QualityScore, EvalError>>,
    {
        Self {
            script: Mutex::new(verdicts.into_iter().collect()),
            fallback: None,
            scored_rounds: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `verdict`
    pub fn constant(verdict: Result<QualityScore, EvalError>) -> Self {
        Self::new([]).with_fallback(verdict)
    }

    pub fn with_fallback(mut self, verdict: Result<QualityScore, EvalError>) -> Self {
        self.fallback = Some(verdict);
        self
    }

    pub fn call_count(&self) -> usize {
        self.scored_rounds.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Rounds of the candidates scored so far, in call order
    pub fn scored_rounds(&self) -> Vec<u32> {
        self.scored_rounds.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl QualityEvaluator for ScriptedEvaluator {
    async fn score(&self, candidate: &Candidate, _request: &ContentRequest) -> Result<QualityScore, EvalError> {
        self.scored_rounds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(candidate.round());

        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(verdict) => verdict,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| Err(EvalError::Malformed("scripted evaluator exhausted".to_string()))),
        }
    }
}
