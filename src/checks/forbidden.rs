//! Forbidden-term check: case-insensitive denylist scan reporting every match

use regex::{Regex, RegexBuilder};

use crate::checks::feedback::FailureCategory;
use crate::checks::traits::{Check, CheckResult};
use crate::content::{Candidate, ContentRequest};

pub struct ForbiddenTermCheck;

impl ForbiddenTermCheck {
    /// Every denylisted term found in `text`, in denylist order, without duplicates
    pub fn find_matches(text: &str, denylist: &[String]) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut found: Vec<String> = Vec::new();

        for term in denylist {
            if found.iter().any(|f| f.eq_ignore_ascii_case(term)) {
                continue;
            }
            if term_matches(term, text, &lowered) {
                found.push(term.clone());
            }
        }

        found
    }
}

/// ASCII terms match from a word start, so inflections count ("selling" for
/// "sell") but embedded text does not ("undervalued" for "overvalued").
/// Anything else matches as a substring.
fn term_matches(term: &str, text: &str, lowered: &str) -> bool {
    if term.is_ascii() && term.chars().next().is_some_and(is_word_char) {
        match word_pattern(term) {
            Some(re) => re.is_match(text),
            None => lowered.contains(&term.to_lowercase()),
        }
    } else {
        lowered.contains(&term.to_lowercase())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Leading boundary only; a term ending in punctuation ("U.S.") still matches before a space
fn word_pattern(term: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(r"\b{}", regex::escape(term)))
        .case_insensitive(true)
        .build()
        .ok()
}

impl Check for ForbiddenTermCheck {
    fn name(&self) -> &str {
        "forbidden_terms"
    }

    fn check(&self, candidate: &Candidate, request: &ContentRequest) -> CheckResult {
        let found = Self::find_matches(candidate.as_text(), request.denylist());
        let reasons = found
            .into_iter()
            .map(|term| format!("contains forbidden term \"{}\"", term))
            .collect();
        CheckResult::from_reasons(self.name(), FailureCategory::Forbidden, reasons)
    }
}
