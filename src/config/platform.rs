//! Per-platform policy: length, denylist, structure and scoring.
//!
//! Built-in profiles cover every platform; YAML entries override them
//! field by field.

use serde::{Deserialize, Serialize};

use crate::checks::Severity;
use crate::content::{ContentRequest, LengthRange, LengthUnit, Platform, UnitRule};
use crate::error::Result;
use crate::evaluator::{Dimension, HardFailRule, Rubric};
use crate::source::SourceDocument;

const ENGLISH_DENYLIST: &[&str] = &[
    "price target",
    "target price",
    "buy",
    "sell",
    "overvalued",
    "guaranteed",
    "to the moon",
    "delve",
    "game-changer",
];

const CHINESE_DENYLIST: &[&str] = &["目标价", "买入", "卖出", "强烈推荐", "抄底", "必涨", "稳赚", "翻倍股"];

/// Resolved policy for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub length: LengthRange,
    pub denylist: Vec<String>,
    /// Closing line template; `{report_url}`, `{ticker}` and `{ticker_lower}` are expanded
    pub closing_line: Option<String>,
    pub required_units: Option<UnitRule>,
    pub disclaimer: Option<String>,
    pub required_phrases: Vec<String>,
    pub fabrication_severity: Severity,
    /// Report link template, same placeholders as `closing_line`
    pub report_url: String,
    pub rubric: Rubric,
}

impl PlatformProfile {
    pub fn builtin(platform: Platform) -> Self {
        let english = |min, max| PlatformProfile {
            platform,
            length: LengthRange::new(min, max, LengthUnit::Words),
            denylist: ENGLISH_DENYLIST.iter().map(|s| s.to_string()).collect(),
            closing_line: Some("Data: {report_url}".to_string()),
            required_units: None,
            disclaimer: None,
            required_phrases: Vec::new(),
            fabrication_severity: Severity::Warn,
            report_url: "https://www.100baggers.club/reports/{ticker_lower}".to_string(),
            rubric: Rubric::default(),
        };
        let chinese = |min, max| PlatformProfile {
            platform,
            length: LengthRange::new(min, max, LengthUnit::Chars),
            denylist: CHINESE_DENYLIST.iter().map(|s| s.to_string()).collect(),
            closing_line: None,
            required_units: None,
            disclaimer: Some("⚠️ 信息整理，不构成投资建议".to_string()),
            required_phrases: Vec::new(),
            fabrication_severity: Severity::Warn,
            report_url: "https://www.100baggers.club/zh/reports/{ticker_lower}".to_string(),
            rubric: Rubric::default(),
        };

        match platform {
            Platform::Twitter => english(300, 500),
            Platform::Xueqiu => chinese(2000, 5000),
            Platform::Xiaohongshu => PlatformProfile {
                required_units: Some(UnitRule { count: 5, marker: None }),
                ..chinese(300, 1500)
            },
            Platform::YouTube => PlatformProfile {
                closing_line: Some("Full report: {report_url}".to_string()),
                ..english(600, 1800)
            },
        }
    }

    /// Apply every field set in `overrides`
    pub fn apply(&mut self, overrides: &PlatformOverrides) {
        if let Some(min) = overrides.min_length {
            self.length.min = min;
        }
        if let Some(max) = overrides.max_length {
            self.length.max = max;
        }
        if let Some(unit) = overrides.length_unit {
            self.length.unit = unit;
        }
        if let Some(denylist) = &overrides.denylist {
            self.denylist = denylist.clone();
        }
        if !overrides.extra_denylist.is_empty() {
            self.denylist.extend(overrides.extra_denylist.iter().cloned());
        }
        if let Some(line) = &overrides.closing_line {
            self.closing_line = Some(line.clone()).filter(|l| !l.trim().is_empty());
        }
        if let Some(count) = overrides.required_units {
            self.required_units = (count > 0).then(|| UnitRule {
                count,
                marker: overrides.unit_marker.clone(),
            });
        }
        if let Some(disclaimer) = &overrides.disclaimer {
            self.disclaimer = Some(disclaimer.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(phrases) = &overrides.required_phrases {
            self.required_phrases = phrases.clone();
        }
        if let Some(severity) = overrides.fabrication_severity {
            self.fabrication_severity = severity;
        }
        if let Some(url) = &overrides.report_url {
            self.report_url = url.clone();
        }
        if let Some(threshold) = overrides.threshold {
            self.rubric.threshold = threshold;
        }
        if let Some(rules) = &overrides.hard_fail_rules {
            self.rubric.hard_fail_rules = rules.clone();
        }
        if let Some(dimensions) = &overrides.dimensions {
            self.rubric.dimensions = dimensions.clone();
        }
    }

    pub fn report_url_for(&self, ticker: &str) -> String {
        expand(&self.report_url, ticker, "")
    }

    pub fn closing_line_for(&self, ticker: &str) -> Option<String> {
        let url = self.report_url_for(ticker);
        self.closing_line.as_deref().map(|line| expand(line, ticker, &url))
    }

    /// Build the validated request for `document` under this policy
    pub fn build_request(&self, document: &SourceDocument) -> Result<ContentRequest> {
        let url = self.report_url_for(&document.ticker);
        let mut builder = ContentRequest::builder(self.platform, document.ticker.clone())
            .source_text(document.source_text())
            .bindings(&document.bindings(&url))
            .length(self.length.min, self.length.max, self.length.unit)
            .denylist(self.denylist.iter().cloned())
            .rubric(self.rubric.clone())
            .fabrication_severity(self.fabrication_severity);

        if !document.company_name.trim().is_empty() {
            builder = builder.company_name(document.company_name.clone());
        }
        if let Some(line) = self.closing_line_for(&document.ticker) {
            builder = builder.closing_line(line);
        }
        if let Some(units) = &self.required_units {
            builder = builder.required_units(units.count, units.marker.clone());
        }
        if let Some(disclaimer) = &self.disclaimer {
            builder = builder.disclaimer(disclaimer.clone());
        }
        for phrase in &self.required_phrases {
            builder = builder.required_phrase(phrase.clone());
        }

        builder.build()
    }
}

fn expand(template: &str, ticker: &str, report_url: &str) -> String {
    template
        .replace("{report_url}", report_url)
        .replace("{ticker_lower}", &ticker.to_lowercase())
        .replace("{ticker}", &ticker.to_uppercase())
}

/// YAML overrides for one platform; unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_unit: Option<LengthUnit>,

    /// Replaces the built-in denylist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist: Option<Vec<String>>,

    /// Appended to the denylist
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_denylist: Vec<String>,

    /// Empty string removes the closing line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_line: Option<String>,

    /// Zero removes the unit requirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_units: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_marker: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_phrases: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fabrication_severity: Option<Severity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_fail_rules: Option<Vec<HardFailRule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<Dimension>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> SourceDocument {
        SourceDocument {
            ticker: "TSM".to_string(),
            company_name: "Taiwan Semiconductor".to_string(),
            executive_summary: "Advanced nodes carry 69% of wafer revenue.".to_string(),
            core_contradiction: "Capex intensity versus pricing power.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_profiles() {
        let twitter = PlatformProfile::builtin(Platform::Twitter);
        assert_eq!(twitter.length, LengthRange::new(300, 500, LengthUnit::Words));
        assert_eq!(
            twitter.closing_line_for("TSM").as_deref(),
            Some("Data: https://www.100baggers.club/reports/tsm")
        );

        let xhs = PlatformProfile::builtin(Platform::Xiaohongshu);
        assert_eq!(xhs.length.unit, LengthUnit::Chars);
        assert_eq!(xhs.required_units.as_ref().map(|u| u.count), Some(5));
        assert!(xhs.closing_line.is_none());
        assert!(xhs.disclaimer.is_some());
    }

    #[test]
    fn test_overrides_apply_field_by_field() {
        let mut profile = PlatformProfile::builtin(Platform::Twitter);
        let overrides: PlatformOverrides = serde_yaml::from_str(
            "max_length: 400\nextra_denylist: [moonshot]\nthreshold: 3.5\nhard_fail_rules: [price_target]\n",
        )
        .unwrap();
        profile.apply(&overrides);

        assert_eq!(profile.length.min, 300);
        assert_eq!(profile.length.max, 400);
        assert!(profile.denylist.contains(&"moonshot".to_string()));
        assert!(profile.denylist.contains(&"buy".to_string()));
        assert_eq!(profile.rubric.threshold, 3.5);
        assert_eq!(profile.rubric.hard_fail_rules, vec![HardFailRule::PriceTarget]);
        assert_eq!(profile.rubric.dimensions.len(), 3);
    }

    #[test]
    fn test_empty_closing_line_removes_it() {
        let mut profile = PlatformProfile::builtin(Platform::Twitter);
        profile.apply(&PlatformOverrides {
            closing_line: Some(String::new()),
            required_units: Some(0),
            ..Default::default()
        });
        assert!(profile.closing_line.is_none());
        assert!(profile.required_units.is_none());
    }

    #[test]
    fn test_build_request_carries_policy() {
        let request = PlatformProfile::builtin(Platform::Xueqiu).build_request(&document()).unwrap();
        assert_eq!(request.platform(), Platform::Xueqiu);
        assert_eq!(request.ticker(), "TSM");
        assert_eq!(request.company_name(), "Taiwan Semiconductor");
        assert_eq!(request.length().unit, LengthUnit::Chars);
        assert!(request.denylist().contains(&"目标价".to_string()));
        assert!(
            request
                .structure()
                .required_phrases
                .contains(&"⚠️ 信息整理，不构成投资建议".to_string())
        );
    }

    #[test]
    fn test_build_request_rejects_inverted_range() {
        let mut profile = PlatformProfile::builtin(Platform::Twitter);
        profile.apply(&PlatformOverrides {
            min_length: Some(600),
            ..Default::default()
        });
        let err = profile.build_request(&document()).unwrap_err();
        assert!(err.is_invalid_request());
    }
}
