//! Fabrication guard: numbers in the candidate that never appear in the source
//!
//! Heuristic only. Small values and numbers inside the closing line are ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::checks::feedback::FailureCategory;
use crate::checks::traits::{Check, CheckResult};
use crate::content::{Candidate, ContentRequest};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?").expect("number regex"));

/// Values at or below this are too common to be meaningful
const TRIVIAL_MAX: f64 = 10.0;

pub struct FabricationCheck;

impl FabricationCheck {
    /// Numeric tokens in `text` absent from `source`, in order of first appearance
    pub fn untraced_numbers(text: &str, source: &str, ignore: &[&str]) -> Vec<String> {
        let known: Vec<f64> = numbers(source).map(|(_, v)| v).collect();
        let ignored: Vec<f64> = ignore.iter().flat_map(|s| numbers(s).map(|(_, v)| v)).collect();

        let mut untraced: Vec<String> = Vec::new();
        for (token, value) in numbers(text) {
            if value <= TRIVIAL_MAX || contains(&ignored, value) || contains(&known, value) {
                continue;
            }
            if !untraced.contains(&token) {
                untraced.push(token);
            }
        }
        untraced
    }
}

fn numbers(text: &str) -> impl Iterator<Item = (String, f64)> + '_ {
    NUMBER.find_iter(text).filter_map(|m| {
        let token = m.as_str().to_string();
        token.replace(',', "").parse::<f64>().ok().map(|v| (token, v))
    })
}

fn contains(values: &[f64], value: f64) -> bool {
    values.iter().any(|v| (v - value).abs() < 1e-9)
}

impl Check for FabricationCheck {
    fn name(&self) -> &str {
        "fabrication"
    }

    fn check(&self, candidate: &Candidate, request: &ContentRequest) -> CheckResult {
        let closing = request.structure().closing_line.as_deref();
        let ignore: Vec<&str> = closing.into_iter().collect();
        let reasons = Self::untraced_numbers(candidate.as_text(), request.source_text(), &ignore)
            .into_iter()
            .map(|n| format!("number {} does not appear in the source", n))
            .collect();
        CheckResult::from_reasons(self.name(), FailureCategory::Fabrication, reasons)
            .with_severity(request.fabrication_severity())
    }
}
