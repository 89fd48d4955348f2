//! The fixed battery of automatic checks
//!
//! Every check runs; results are collected without short-circuiting.

use log::debug;

use crate::checks::fabrication::FabricationCheck;
use crate::checks::forbidden::ForbiddenTermCheck;
use crate::checks::length::LengthCheck;
use crate::checks::structure::StructureCheck;
use crate::checks::traits::{Check, CheckResult};
use crate::content::{Candidate, ContentRequest};

pub struct CheckBattery {
    checks: Vec<Box<dyn Check>>,
}

impl CheckBattery {
    /// Length, forbidden terms, structure, fabrication
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(LengthCheck),
            Box::new(ForbiddenTermCheck),
            Box::new(StructureCheck),
            Box::new(FabricationCheck),
        ])
    }

    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check against the candidate
    pub fn check_all(&self, candidate: &Candidate, request: &ContentRequest) -> Vec<CheckResult> {
        self.checks
            .iter()
            .map(|check| {
                let result = check.check(candidate, request);
                debug!(
                    "check {} round {}: passed={} reasons={}",
                    result.check,
                    candidate.round(),
                    result.passed,
                    result.reasons.len()
                );
                result
            })
            .collect()
    }

    /// True when any result blocks acceptance
    pub fn any_blocking(results: &[CheckResult]) -> bool {
        results.iter().any(CheckResult::is_blocking)
    }
}

impl Default for CheckBattery {
    fn default() -> Self {
        Self::standard()
    }
}
