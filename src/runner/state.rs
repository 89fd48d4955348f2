//! Mutable state threaded through the rounds of one loop.

use std::cmp::Ordering;

use crate::checks::{CheckResult, RoundFeedback};
use crate::content::{BestEffort, Candidate};
use crate::evaluator::QualityScore;

#[derive(Debug, Default)]
pub struct LoopState {
    pub round: u32,
    /// Best candidate that passed the automatic checks
    pub best: Option<BestEffort>,
    /// Feedback from every rejected round
    pub history: Vec<RoundFeedback>,
    /// Instructions for the next generation call
    pub revision: Option<String>,
    /// At least one candidate was generated
    pub produced: bool,
    /// At least one candidate received a quality score
    pub scored: bool,
    /// The most recent round ended on a service error
    pub service_failure: bool,
    /// That service error was rate limiting
    pub rate_limited: bool,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `candidate` if it strictly improves on the current best.
    /// Returns whether it was kept.
    pub fn offer(&mut self, candidate: &Candidate, score: Option<&QualityScore>, checks: &[CheckResult]) -> bool {
        let improves = match &self.best {
            None => true,
            Some(best) => compare(score, best.score.as_ref()) == Ordering::Greater,
        };
        if improves {
            self.best = Some(BestEffort {
                candidate: candidate.clone(),
                score: score.cloned(),
                checks: checks.to_vec(),
            });
        }
        improves
    }

    pub fn record(&mut self, feedback: RoundFeedback) {
        self.history.push(feedback);
    }

    /// Note how the latest round ended, for classifying exhaustion
    pub fn note_service(&mut self, failed: bool, rate_limited: bool) {
        self.service_failure = failed;
        self.rate_limited = failed && rate_limited;
    }

    /// Content was judged at least once, rather than blocked by the services
    pub fn quality_limited(&self) -> bool {
        self.scored || (self.produced && !self.service_failure)
    }
}

/// Scored beats unscored, no hard fail beats hard fail, then weighted score
fn compare(a: Option<&QualityScore>, b: Option<&QualityScore>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(a), Some(b)) => b
            .hard_fails
            .len()
            .min(1)
            .cmp(&a.hard_fails.len().min(1))
            .then(a.weighted.total_cmp(&b.weighted)),
    }
}
