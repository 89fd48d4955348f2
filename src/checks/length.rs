//! Length check: word or character count within the requested range

use crate::checks::feedback::FailureCategory;
use crate::checks::traits::{Check, CheckResult};
use crate::content::{Candidate, ContentRequest};

pub struct LengthCheck;

impl Check for LengthCheck {
    fn name(&self) -> &str {
        "length"
    }

    fn check(&self, candidate: &Candidate, request: &ContentRequest) -> CheckResult {
        let range = request.length();
        let measured = candidate.measure(range.unit);

        let result = if range.contains(measured) {
            CheckResult::pass(self.name(), FailureCategory::Length)
        } else {
            let direction = if measured < range.min { "too short" } else { "too long" };
            CheckResult::fail(
                self.name(),
                FailureCategory::Length,
                format!(
                    "{}: {} {} (required {}-{})",
                    direction,
                    measured,
                    range.unit.as_str(),
                    range.min,
                    range.max
                ),
            )
        };

        result.with_measured(measured)
    }
}
