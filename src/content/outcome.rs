//! What a finished loop hands back: an accepted artifact or a failure report

use serde::{Deserialize, Serialize};

use crate::checks::{CheckResult, RoundFeedback};
use crate::content::candidate::Candidate;
use crate::content::platform::Platform;
use crate::evaluator::QualityScore;

/// The accepted candidate plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalArtifact {
    pub run_id: String,
    pub platform: Platform,
    pub ticker: String,
    pub candidate: Candidate,
    /// Round that produced the accepted candidate
    pub rounds: u32,
    pub score: QualityScore,
    /// Measured length in the request's unit
    pub measured_length: usize,
    /// Non-blocking check failures on the accepted candidate
    pub warnings: Vec<CheckResult>,
}

/// Why no candidate was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rounds exhausted with candidates that never met the bar
    QualityThresholdNotMet,
    /// Rounds exhausted without any usable candidate
    TransientServiceError,
    /// Like `TransientServiceError`, but the service was rate limiting
    RateLimited,
    /// Wall-clock budget exceeded
    Timeout,
    /// Caller asked the loop to stop
    Aborted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::QualityThresholdNotMet => "quality_threshold_not_met",
            FailureKind::TransientServiceError => "transient_service_error",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Timeout => "timeout",
            FailureKind::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A candidate kept as best effort, with what was known about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestEffort {
    pub candidate: Candidate,
    /// Evaluator verdict, if the candidate got that far
    pub score: Option<QualityScore>,
    pub checks: Vec<CheckResult>,
}

impl BestEffort {
    /// Passed every blocking check
    pub fn passed_checks(&self) -> bool {
        !self.checks.iter().any(CheckResult::is_blocking)
    }
}

/// Terminal report when no candidate was accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub run_id: String,
    pub platform: Platform,
    pub ticker: String,
    pub kind: FailureKind,
    /// Rounds started before the loop stopped
    pub rounds: u32,
    /// Best candidate seen, if any
    pub best: Option<BestEffort>,
    /// Feedback from every rejected round, oldest first
    pub history: Vec<RoundFeedback>,
    /// Human-readable summary of the history
    pub summary: String,
}

impl FailureReport {
    /// Every failure message across all rounds
    pub fn reasons(&self) -> Vec<String> {
        self.history
            .iter()
            .flat_map(|fb| fb.failures.iter().map(|f| f.message.clone()))
            .collect()
    }

    /// Failure messages of the last rejected round
    pub fn last_reasons(&self) -> Vec<String> {
        self.history
            .last()
            .map(|fb| fb.failures.iter().map(|f| f.message.clone()).collect())
            .unwrap_or_default()
    }
}

/// Result of one loop run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoopOutcome {
    Accepted(FinalArtifact),
    Failed(FailureReport),
}

impl LoopOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LoopOutcome::Accepted(_))
    }

    pub fn artifact(&self) -> Option<&FinalArtifact> {
        match self {
            LoopOutcome::Accepted(a) => Some(a),
            LoopOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match self {
            LoopOutcome::Accepted(_) => None,
            LoopOutcome::Failed(r) => Some(r),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            LoopOutcome::Accepted(a) => a.platform,
            LoopOutcome::Failed(r) => r.platform,
        }
    }

    pub fn rounds(&self) -> u32 {
        match self {
            LoopOutcome::Accepted(a) => a.rounds,
            LoopOutcome::Failed(r) => r.rounds,
        }
    }
}
