//! Evaluation rubric: weighted soft dimensions plus hard-fail vetoes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PostforgeError, Result};

/// One soft dimension scored 1-5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    /// Question put to the evaluator
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Dimension {
    pub fn new(key: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            weight,
        }
    }
}

/// Conditions that veto acceptance regardless of the weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardFailRule {
    /// An explicit price target or fair value per share
    PriceTarget,
    /// Buy/sell/hold style recommendations
    InvestmentAdvice,
    /// "Undervalued by 30%" style claims
    ValuationClaim,
    /// Diagrams or code blocks in the post
    CodeBlock,
    /// Numbers the evaluator believes were invented
    Fabrication,
}

impl HardFailRule {
    pub const ALL: [HardFailRule; 5] = [
        HardFailRule::PriceTarget,
        HardFailRule::InvestmentAdvice,
        HardFailRule::ValuationClaim,
        HardFailRule::CodeBlock,
        HardFailRule::Fabrication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HardFailRule::PriceTarget => "price_target",
            HardFailRule::InvestmentAdvice => "investment_advice",
            HardFailRule::ValuationClaim => "valuation_claim",
            HardFailRule::CodeBlock => "code_block",
            HardFailRule::Fabrication => "fabrication",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            HardFailRule::PriceTarget => {
                "Explicit price targets or per-share fair values (\"target price $300\", \"目标价$300\")"
            }
            HardFailRule::InvestmentAdvice => {
                "Telling the reader what to do with the stock (buy, sell, hold, 建仓, 加仓, 减仓)"
            }
            HardFailRule::ValuationClaim => {
                "Explicit over/undervaluation claims (\"undervalued by 30%\", \"被低估\")"
            }
            HardFailRule::CodeBlock => "Code blocks, mermaid diagrams, graph TD/LR or flowchart blocks",
            HardFailRule::Fabrication => "Numbers or facts that contradict the supplied source excerpt",
        }
    }
}

impl std::fmt::Display for HardFailRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HardFailRule {
    type Err = PostforgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| PostforgeError::invalid(format!("unknown hard-fail rule '{}'", s)))
    }
}

/// Scoring policy for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rubric {
    pub dimensions: Vec<Dimension>,
    pub hard_fail_rules: Vec<HardFailRule>,
    /// Minimum weighted score (1-5) to accept
    pub threshold: f64,
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            dimensions: vec![
                Dimension::new("data_density", "Does every key claim cite a specific number?", 1.0),
                Dimension::new(
                    "coherence",
                    "Does the text flow naturally, with no garbled sentences, truncation or orphan phrases?",
                    1.0,
                ),
                Dimension::new(
                    "analysis_depth",
                    "Does it go beyond surface metrics to real insight about the business?",
                    1.0,
                ),
            ],
            hard_fail_rules: vec![
                HardFailRule::PriceTarget,
                HardFailRule::InvestmentAdvice,
                HardFailRule::ValuationClaim,
                HardFailRule::CodeBlock,
            ],
            threshold: 3.0,
        }
    }
}

impl Rubric {
    pub fn validate(&self) -> Result<()> {
        if !(1.0..=5.0).contains(&self.threshold) {
            return Err(PostforgeError::invalid(format!(
                "threshold {} is outside the 1-5 scale",
                self.threshold
            )));
        }
        if self.dimensions.is_empty() {
            return Err(PostforgeError::invalid("rubric has no dimensions"));
        }
        for (i, dim) in self.dimensions.iter().enumerate() {
            if dim.key.trim().is_empty() {
                return Err(PostforgeError::invalid("rubric dimension key is empty"));
            }
            if !(dim.weight.is_finite() && dim.weight > 0.0) {
                return Err(PostforgeError::invalid(format!(
                    "dimension '{}' weight must be positive",
                    dim.key
                )));
            }
            if self.dimensions[..i].iter().any(|d| d.key == dim.key) {
                return Err(PostforgeError::invalid(format!("duplicate dimension '{}'", dim.key)));
            }
        }
        Ok(())
    }

    /// Weighted mean of per-dimension scores; `None` if any dimension is unscored
    pub fn weighted(&self, scores: &std::collections::BTreeMap<String, f64>) -> Option<f64> {
        let mut sum = 0.0;
        let mut weights = 0.0;
        for dim in &self.dimensions {
            let score = scores.get(&dim.key)?;
            sum += score * dim.weight;
            weights += dim.weight;
        }
        (weights > 0.0).then(|| sum / weights)
    }

    /// Evaluation prompt for `content`
    pub fn build_prompt(&self, platform: &str, ticker: &str, content: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Evaluate the following generated content for the platform \"{}\".\n\n",
            platform
        ));

        if !self.hard_fail_rules.is_empty() {
            prompt.push_str("## Hard-fail rules (any single violation fails the content)\n\n");
            for rule in &self.hard_fail_rules {
                prompt.push_str(&format!("- `{}`: {}\n", rule.as_str(), rule.describe()));
            }
            prompt.push_str(
                "\nBusiness-segment valuations, market-implied assumptions and valuation multiples \
                 compared with peers are analysis, not violations.\n\n",
            );
        }

        prompt.push_str("## Quality dimensions (score each 1-5)\n\n");
        for dim in &self.dimensions {
            prompt.push_str(&format!("- `{}`: {}\n", dim.key, dim.label));
        }

        prompt.push_str("\n## Output\n\nReturn ONLY a JSON object:\n\n");
        prompt.push_str("{\n  \"violations\": [hard-fail rule keys violated, empty if none],\n  \"scores\": {");
        let keys: Vec<String> = self.dimensions.iter().map(|d| format!("\"{}\": 1-5", d.key)).collect();
        prompt.push_str(&keys.join(", "));
        prompt.push_str(
            "},\n  \"rewrite_instructions\": \"specific fixes for the actual problems only, empty if none\"\n}\n\n",
        );

        prompt.push_str(&format!("Platform: {}\nTicker: {}\n\n", platform, ticker.to_uppercase()));
        prompt.push_str("--- BEGIN CONTENT ---\n");
        prompt.push_str(content);
        prompt.push_str("\n--- END CONTENT ---\n");

        prompt
    }
}
