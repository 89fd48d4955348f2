//! Structured feedback for rejected rounds.
//!
//! Every rejected candidate produces a `RoundFeedback`. The formatter turns
//! the most recent one into revision instructions for the next generation
//! call, and the whole history into the summary of a failure report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checks::traits::CheckResult;

/// Category of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Word or character count out of range
    Length,
    /// Denylisted term present
    Forbidden,
    /// Closing line, unit count, fences, script tags or required phrases
    Structure,
    /// Numbers not traceable to the source
    Fabrication,
    /// Evaluator score below threshold, or evaluator unavailable
    Judge,
    /// Evaluator hard-fail rule triggered
    HardFail,
    /// Generation produced nothing usable
    Generation,
    /// Call or loop deadline elapsed
    Timeout,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Length => "length",
            FailureCategory::Forbidden => "forbidden_term",
            FailureCategory::Structure => "structure",
            FailureCategory::Fabrication => "fabrication",
            FailureCategory::Judge => "judge",
            FailureCategory::HardFail => "hard_fail",
            FailureCategory::Generation => "generation",
            FailureCategory::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failure reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub category: FailureCategory,
    pub message: String,
    /// Additional context, e.g. evaluator rewrite instructions
    pub context: Option<String>,
}

impl FailureDetail {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// One detail per reason of a failed check
    pub fn from_check(result: &CheckResult) -> Vec<Self> {
        result
            .reasons
            .iter()
            .map(|r| Self::new(result.category, r.clone()))
            .collect()
    }
}

/// Which stage rejected the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStage {
    Generation,
    Checks,
    Evaluator,
}

impl RoundStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStage::Generation => "generation",
            RoundStage::Checks => "checks",
            RoundStage::Evaluator => "evaluator",
        }
    }
}

/// Feedback from one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundFeedback {
    pub round: u32,
    pub stage: RoundStage,
    pub passed: bool,
    pub failures: Vec<FailureDetail>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RoundFeedback {
    pub fn pass(round: u32, stage: RoundStage, duration_ms: u64) -> Self {
        Self {
            round,
            stage,
            passed: true,
            failures: Vec::new(),
            timestamp: Utc::now(),
            duration_ms,
        }
    }

    pub fn fail(round: u32, stage: RoundStage, failures: Vec<FailureDetail>, duration_ms: u64) -> Self {
        Self {
            round,
            stage,
            passed: false,
            failures,
            timestamp: Utc::now(),
            duration_ms,
        }
    }

    pub fn add_failure(&mut self, failure: FailureDetail) {
        self.passed = false;
        self.failures.push(failure);
    }

    /// Distinct categories, in stable order
    pub fn categories(&self) -> Vec<FailureCategory> {
        let mut cats: Vec<_> = self.failures.iter().map(|f| f.category).collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

/// Renders feedback for revision prompts and failure reports
pub struct FeedbackFormatter {
    /// Maximum failures shown per category
    pub max_failures_per_category: usize,
    /// Maximum lines of context per failure
    pub max_context_lines: usize,
}

impl Default for FeedbackFormatter {
    fn default() -> Self {
        Self {
            max_failures_per_category: 10,
            max_context_lines: 8,
        }
    }
}

impl FeedbackFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_failures_per_category(mut self, max: usize) -> Self {
        self.max_failures_per_category = max;
        self
    }

    /// Revision instructions for the round after `feedback`; empty if it passed
    pub fn revision_instructions(&self, feedback: &RoundFeedback) -> String {
        if feedback.passed {
            return String::new();
        }

        let mut by_category: BTreeMap<FailureCategory, Vec<&FailureDetail>> = BTreeMap::new();
        for failure in &feedback.failures {
            by_category.entry(failure.category).or_default().push(failure);
        }

        let mut output = String::new();
        for (category, failures) in by_category {
            for failure in failures.iter().take(self.max_failures_per_category) {
                output.push_str(&format!("- [{}] {}\n", category, failure.message));
                if let Some(ctx) = &failure.context {
                    output.push_str(&indent_text(&truncate_lines(ctx, self.max_context_lines), "  "));
                    output.push('\n');
                }
            }
            if failures.len() > self.max_failures_per_category {
                output.push_str(&format!(
                    "- ... and {} more {} issues\n",
                    failures.len() - self.max_failures_per_category,
                    category
                ));
            }
        }

        output.trim_end().to_string()
    }

    /// Summary of every failed round, most recent last
    pub fn format_history(&self, history: &[RoundFeedback]) -> String {
        let failed: Vec<_> = history.iter().filter(|f| !f.passed).collect();
        if failed.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        for fb in &failed {
            let categories: Vec<_> = fb.categories().iter().map(|c| c.as_str()).collect();
            output.push_str(&format!(
                "Round {} ({}): {} issue(s) in {}\n",
                fb.round,
                fb.stage.as_str(),
                fb.failures.len(),
                categories.join(", ")
            ));
        }

        if let Some(latest) = failed.last() {
            output.push_str("\nLast round:\n");
            output.push_str(&self.revision_instructions(latest));
        }

        output.trim_end().to_string()
    }
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    let mut result = text.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    if total > max_lines {
        result.push_str("\n... (truncated)");
    }
    result
}

fn indent_text(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
