//! Automatic checks - core interfaces
//! A check is a pure, synchronous inspection of one candidate

use serde::{Deserialize, Serialize};

use crate::checks::feedback::FailureCategory;
use crate::content::{Candidate, ContentRequest};

/// How much a failing check matters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks acceptance and skips the evaluator for the round
    #[default]
    Fail,
    /// Reported in feedback and on the artifact, never blocks
    Warn,
}

/// Outcome of one check against one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check that produced this result
    pub check: String,
    pub category: FailureCategory,
    pub passed: bool,
    pub severity: Severity,
    /// Every reason the check failed (empty if passed)
    pub reasons: Vec<String>,
    /// Measured value, when the check measures something (e.g. word count)
    pub measured: Option<usize>,
}

impl CheckResult {
    /// Create a passing result
    pub fn pass(check: impl Into<String>, category: FailureCategory) -> Self {
        Self {
            check: check.into(),
            category,
            passed: true,
            severity: Severity::Fail,
            reasons: Vec::new(),
            measured: None,
        }
    }

    /// Create a failing result with a single reason
    pub fn fail(check: impl Into<String>, category: FailureCategory, reason: impl Into<String>) -> Self {
        Self::fail_with_reasons(check, category, vec![reason.into()])
    }

    /// Create a failing result with multiple reasons
    pub fn fail_with_reasons(check: impl Into<String>, category: FailureCategory, reasons: Vec<String>) -> Self {
        Self {
            check: check.into(),
            category,
            passed: false,
            severity: Severity::Fail,
            reasons,
            measured: None,
        }
    }

    /// Pass when `reasons` is empty, fail with all of them otherwise
    pub fn from_reasons(check: impl Into<String>, category: FailureCategory, reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            Self::pass(check, category)
        } else {
            Self::fail_with_reasons(check, category, reasons)
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_measured(mut self, measured: usize) -> Self {
        self.measured = Some(measured);
        self
    }

    /// Failed at `Fail` severity
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Fail
    }

    /// Failed at `Warn` severity
    pub fn is_warning(&self) -> bool {
        !self.passed && self.severity == Severity::Warn
    }
}

/// A deterministic, rule-based validator
pub trait Check: Send + Sync {
    /// Short stable name used in reports
    fn name(&self) -> &str;

    /// Run against a candidate; must not have side effects
    fn check(&self, candidate: &Candidate, request: &ContentRequest) -> CheckResult;
}
