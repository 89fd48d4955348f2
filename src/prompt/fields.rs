//! Recognized prompt placeholders and the values bound to them

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PostforgeError;

/// Every placeholder a prompt template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptField {
    Ticker,
    TickerLower,
    CompanyName,
    ExecutiveSummary,
    CoreContradiction,
    KeyFindings,
    FinancialSnapshot,
    RiskFactors,
    BullCase,
    BearCase,
    SourceText,
    ReportUrl,
    MinLength,
    MaxLength,
    LengthUnit,
    ClosingLine,
    Disclaimer,
    UnitCount,
    Platform,
}

impl PromptField {
    pub const ALL: [PromptField; 19] = [
        PromptField::Ticker,
        PromptField::TickerLower,
        PromptField::CompanyName,
        PromptField::ExecutiveSummary,
        PromptField::CoreContradiction,
        PromptField::KeyFindings,
        PromptField::FinancialSnapshot,
        PromptField::RiskFactors,
        PromptField::BullCase,
        PromptField::BearCase,
        PromptField::SourceText,
        PromptField::ReportUrl,
        PromptField::MinLength,
        PromptField::MaxLength,
        PromptField::LengthUnit,
        PromptField::ClosingLine,
        PromptField::Disclaimer,
        PromptField::UnitCount,
        PromptField::Platform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptField::Ticker => "ticker",
            PromptField::TickerLower => "ticker_lower",
            PromptField::CompanyName => "company_name",
            PromptField::ExecutiveSummary => "executive_summary",
            PromptField::CoreContradiction => "core_contradiction",
            PromptField::KeyFindings => "key_findings",
            PromptField::FinancialSnapshot => "financial_snapshot",
            PromptField::RiskFactors => "risk_factors",
            PromptField::BullCase => "bull_case",
            PromptField::BearCase => "bear_case",
            PromptField::SourceText => "source_text",
            PromptField::ReportUrl => "report_url",
            PromptField::MinLength => "min_length",
            PromptField::MaxLength => "max_length",
            PromptField::LengthUnit => "length_unit",
            PromptField::ClosingLine => "closing_line",
            PromptField::Disclaimer => "disclaimer",
            PromptField::UnitCount => "unit_count",
            PromptField::Platform => "platform",
        }
    }
}

impl fmt::Display for PromptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PromptField {
    type Err = PostforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| PostforgeError::invalid(format!("unknown prompt placeholder '{}'", s)))
    }
}

/// Values bound to placeholders for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBindings {
    values: BTreeMap<PromptField, String>,
}

impl PromptBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any previous one
    pub fn bind(&mut self, field: PromptField, value: impl Into<String>) -> &mut Self {
        self.values.insert(field, value.into());
        self
    }

    /// Builder-style bind
    pub fn with(mut self, field: PromptField, value: impl Into<String>) -> Self {
        self.bind(field, value);
        self
    }

    /// Merge `other` on top of self
    pub fn extend(&mut self, other: &PromptBindings) {
        for (field, value) in &other.values {
            self.values.insert(*field, value.clone());
        }
    }

    pub fn get(&self, field: PromptField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Bound to a non-blank value
    pub fn is_bound(&self, field: PromptField) -> bool {
        self.get(field).is_some_and(|v| !v.trim().is_empty())
    }

    /// Render context keyed by placeholder name
    pub fn to_json(&self) -> Value {
        let map = self
            .values
            .iter()
            .map(|(field, value)| (field.as_str().to_string(), Value::String(value.clone())))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
