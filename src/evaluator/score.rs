//! Quality scores and parsing of the evaluator's JSON verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluator::rubric::{HardFailRule, Rubric};
use crate::llm::parse_json_block;

/// Verdict of the model-based evaluator for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Per-dimension scores on the 1-5 scale
    pub dimensions: BTreeMap<String, f64>,
    /// Weighted mean over the rubric dimensions
    pub weighted: f64,
    /// Triggered hard-fail rules; any entry vetoes acceptance
    pub hard_fails: Vec<String>,
    pub rewrite_instructions: String,
}

impl QualityScore {
    /// Score with every rubric dimension at `value` and no hard fails
    pub fn uniform(rubric: &Rubric, value: f64) -> Self {
        let dimensions = rubric.dimensions.iter().map(|d| (d.key.clone(), value)).collect();
        Self {
            dimensions,
            weighted: value,
            hard_fails: Vec::new(),
            rewrite_instructions: String::new(),
        }
    }

    pub fn with_hard_fail(mut self, rule: impl Into<String>) -> Self {
        self.hard_fails.push(rule.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.rewrite_instructions = instructions.into();
        self
    }

    /// No hard fail and weighted score at or above `threshold`
    pub fn accepts(&self, threshold: f64) -> bool {
        self.hard_fails.is_empty() && self.weighted >= threshold
    }
}

/// Parse the evaluator's raw output against `rubric`.
///
/// Fails with a description when the output is not JSON, misses a rubric
/// dimension, or scores outside 1-5.
pub fn parse_score(raw: &str, rubric: &Rubric) -> Result<QualityScore, String> {
    let value = parse_json_block(raw).ok_or_else(|| "evaluator output is not JSON".to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| "evaluator output is not a JSON object".to_string())?;

    let scores = obj
        .get("scores")
        .and_then(Value::as_object)
        .ok_or_else(|| "evaluator output has no \"scores\" object".to_string())?;

    let mut dimensions = BTreeMap::new();
    for dim in &rubric.dimensions {
        let score = scores
            .get(&dim.key)
            .and_then(as_number)
            .ok_or_else(|| format!("missing score for dimension '{}'", dim.key))?;
        if !(1.0..=5.0).contains(&score) {
            return Err(format!("score {} for '{}' is outside 1-5", score, dim.key));
        }
        dimensions.insert(dim.key.clone(), score);
    }

    let weighted = rubric
        .weighted(&dimensions)
        .ok_or_else(|| "rubric weights are empty".to_string())?;

    let hard_fails = obj
        .get("violations")
        .and_then(Value::as_array)
        .map(|items| hard_fails(items, rubric))
        .unwrap_or_default();

    let rewrite_instructions = obj
        .get("rewrite_instructions")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(QualityScore {
        dimensions,
        weighted,
        hard_fails,
        rewrite_instructions,
    })
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Known rules outside the rubric are dropped; free-text violations are kept
fn hard_fails(items: &[Value], rubric: &Rubric) -> Vec<String> {
    let mut out = Vec::new();
    for item in items.iter().filter_map(Value::as_str) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.parse::<HardFailRule>() {
            Ok(rule) if !rubric.hard_fail_rules.contains(&rule) => {
                log::debug!("ignoring hard-fail '{}' not in rubric", rule);
            }
            Ok(rule) => out.push(rule.as_str().to_string()),
            Err(_) => out.push(item.to_string()),
        }
    }
    out
}
