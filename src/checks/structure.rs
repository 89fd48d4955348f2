//! Structural-marker check: closing line, unit count, disallowed markup, required phrases

use std::sync::LazyLock;

use regex::Regex;

use crate::checks::feedback::FailureCategory;
use crate::checks::traits::{Check, CheckResult};
use crate::content::{Candidate, ContentRequest, Payload};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(```|~~~)").expect("fence regex"));

static SCRIPTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(script|iframe)\b|javascript:|\bon(load|error|click)\s*=").expect("script regex")
});

static DIAGRAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(mermaid|graph\s+(TD|LR|TB|RL|BT)|flowchart\s+\w+)\s*$").expect("diagram regex"));

pub struct StructureCheck;

impl StructureCheck {
    /// Every structural rule the text violates
    pub fn violations(candidate: &Candidate, request: &ContentRequest) -> Vec<String> {
        let rules = request.structure();
        let text = candidate.as_text();
        let mut reasons = Vec::new();

        if let Some(closing) = &rules.closing_line {
            let last = last_non_empty_line(closing_target(candidate));
            if !last.is_some_and(|line| line.contains(closing.trim())) {
                reasons.push(format!("missing closing line \"{}\" at the end", closing.trim()));
            }
        }

        if let Some(units) = &rules.required_units {
            match candidate.unit_count(units.marker.as_deref()) {
                Some(n) if n == units.count => {}
                Some(n) => reasons.push(format!("expected {} units, found {}", units.count, n)),
                None => reasons.push(format!("expected {} units, found none", units.count)),
            }
        }

        if rules.forbid_code_fences && CODE_FENCE.is_match(text) {
            reasons.push("contains a code fence".to_string());
        }

        if rules.forbid_code_fences && DIAGRAM.is_match(text) {
            reasons.push("contains a diagram block".to_string());
        }

        if rules.forbid_script_tags && SCRIPTING.is_match(text) {
            reasons.push("contains embedded scripting".to_string());
        }

        for phrase in &rules.required_phrases {
            if !text.contains(phrase.as_str()) {
                reasons.push(format!("missing required phrase \"{}\"", phrase));
            }
        }

        reasons
    }
}

/// Text whose last line must carry the closing line: the whole post, or the
/// caption/description of a structured payload
fn closing_target(candidate: &Candidate) -> &str {
    if let Payload::Structured(value) = candidate.payload() {
        for key in ["caption", "description", "script"] {
            if let Some(s) = value.get(key).and_then(|v| v.as_str())
                && !s.trim().is_empty()
            {
                return s;
            }
        }
    }
    candidate.as_text()
}

fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

impl Check for StructureCheck {
    fn name(&self) -> &str {
        "structure"
    }

    fn check(&self, candidate: &Candidate, request: &ContentRequest) -> CheckResult {
        CheckResult::from_reasons(self.name(), FailureCategory::Structure, Self::violations(candidate, request))
    }
}
