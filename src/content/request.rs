//! The immutable input to one generate-evaluate-revise loop

use serde::{Deserialize, Serialize};

use crate::checks::Severity;
use crate::content::platform::Platform;
use crate::error::{PostforgeError, Result};
use crate::evaluator::Rubric;
use crate::prompt::{PromptBindings, PromptField};

/// How post length is counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Whitespace-separated tokens
    #[default]
    Words,
    /// Unicode scalar values, whitespace included
    Chars,
}

impl LengthUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthUnit::Words => "words",
            LengthUnit::Chars => "characters",
        }
    }

    /// Measure `text` in this unit
    pub fn measure(&self, text: &str) -> usize {
        match self {
            LengthUnit::Words => text.split_whitespace().count(),
            LengthUnit::Chars => text.trim().chars().count(),
        }
    }

    fn label(&self, chinese: bool) -> &'static str {
        match (self, chinese) {
            (LengthUnit::Chars, true) => "字",
            (LengthUnit::Words, true) => "词",
            _ => self.as_str(),
        }
    }
}

/// Inclusive target length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
    #[serde(default)]
    pub unit: LengthUnit,
}

impl LengthRange {
    pub fn new(min: usize, max: usize, unit: LengthUnit) -> Self {
        Self { min, max, unit }
    }

    pub fn contains(&self, measured: usize) -> bool {
        (self.min..=self.max).contains(&measured)
    }
}

/// A required number of discrete sub-units (slides, sections)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRule {
    pub count: usize,
    /// Text marker that starts each unit in plain-text payloads; JSON payloads
    /// count their `slides` array instead
    #[serde(default)]
    pub marker: Option<String>,
}

/// Platform-specific structural requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralRules {
    /// Must appear in the last non-empty line
    pub closing_line: Option<String>,
    pub required_units: Option<UnitRule>,
    pub forbid_code_fences: bool,
    pub forbid_script_tags: bool,
    /// Each must appear verbatim somewhere in the text
    pub required_phrases: Vec<String>,
}

impl Default for StructuralRules {
    fn default() -> Self {
        Self {
            closing_line: None,
            required_units: None,
            forbid_code_fences: true,
            forbid_script_tags: true,
            required_phrases: Vec::new(),
        }
    }
}

/// Everything one loop needs, validated once and never mutated
#[derive(Debug, Clone)]
pub struct ContentRequest {
    platform: Platform,
    ticker: String,
    company_name: String,
    source_text: String,
    bindings: PromptBindings,
    length: LengthRange,
    denylist: Vec<String>,
    structure: StructuralRules,
    rubric: Rubric,
    fabrication_severity: Severity,
}

impl ContentRequest {
    pub fn builder(platform: Platform, ticker: impl Into<String>) -> ContentRequestBuilder {
        ContentRequestBuilder::new(platform, ticker)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Prompt bindings, including the length and structure fields
    pub fn bindings(&self) -> &PromptBindings {
        &self.bindings
    }

    pub fn length(&self) -> LengthRange {
        self.length
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    pub fn structure(&self) -> &StructuralRules {
        &self.structure
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn fabrication_severity(&self) -> Severity {
        self.fabrication_severity
    }

    /// Strip markdown from generated text for this platform
    pub fn wants_plain_text(&self) -> bool {
        !self.platform.is_structured()
    }
}

/// Builder for [`ContentRequest`]; `build` validates every field
#[derive(Debug, Clone)]
pub struct ContentRequestBuilder {
    platform: Platform,
    ticker: String,
    company_name: Option<String>,
    source_text: String,
    bindings: PromptBindings,
    length: Option<LengthRange>,
    denylist: Vec<String>,
    structure: StructuralRules,
    disclaimer: Option<String>,
    rubric: Rubric,
    fabrication_severity: Severity,
}

impl ContentRequestBuilder {
    pub fn new(platform: Platform, ticker: impl Into<String>) -> Self {
        Self {
            platform,
            ticker: ticker.into(),
            company_name: None,
            source_text: String::new(),
            bindings: PromptBindings::new(),
            length: None,
            denylist: Vec::new(),
            structure: StructuralRules::default(),
            disclaimer: None,
            rubric: Rubric::default(),
            fabrication_severity: Severity::Warn,
        }
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = text.into();
        self
    }

    /// Extra prompt bindings; later calls override earlier ones
    pub fn bindings(mut self, bindings: &PromptBindings) -> Self {
        self.bindings.extend(bindings);
        self
    }

    pub fn length(mut self, min: usize, max: usize, unit: LengthUnit) -> Self {
        self.length = Some(LengthRange::new(min, max, unit));
        self
    }

    pub fn denylist<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn closing_line(mut self, line: impl Into<String>) -> Self {
        self.structure.closing_line = Some(line.into());
        self
    }

    pub fn required_units(mut self, count: usize, marker: Option<String>) -> Self {
        self.structure.required_units = Some(UnitRule { count, marker });
        self
    }

    pub fn required_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.structure.required_phrases.push(phrase.into());
        self
    }

    /// A disclaimer is bound for prompts and required in the output
    pub fn disclaimer(mut self, text: impl Into<String>) -> Self {
        self.disclaimer = Some(text.into());
        self
    }

    pub fn forbid_code_fences(mut self, forbid: bool) -> Self {
        self.structure.forbid_code_fences = forbid;
        self
    }

    pub fn forbid_script_tags(mut self, forbid: bool) -> Self {
        self.structure.forbid_script_tags = forbid;
        self
    }

    pub fn rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn fabrication_severity(mut self, severity: Severity) -> Self {
        self.fabrication_severity = severity;
        self
    }

    /// Validate and freeze the request
    pub fn build(self) -> Result<ContentRequest> {
        let ticker = self.ticker.trim().to_string();
        if ticker.is_empty() {
            return Err(PostforgeError::invalid("ticker is empty"));
        }

        if self.source_text.trim().is_empty() {
            return Err(PostforgeError::invalid("source text is empty"));
        }

        let length = self
            .length
            .ok_or_else(|| PostforgeError::invalid("target length range is not set"))?;
        if length.min > length.max {
            return Err(PostforgeError::invalid(format!(
                "length range is inverted: min {} > max {}",
                length.min, length.max
            )));
        }
        if length.max == 0 {
            return Err(PostforgeError::invalid("length range max must be positive"));
        }

        if let Some(units) = &self.structure.required_units
            && units.count == 0
        {
            return Err(PostforgeError::invalid("required unit count must be positive"));
        }

        self.rubric.validate()?;

        let denylist: Vec<String> = self
            .denylist
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut structure = self.structure;
        let company_name = self.company_name.unwrap_or_else(|| ticker.clone());

        let mut bindings = PromptBindings::new()
            .with(PromptField::Ticker, ticker.to_uppercase())
            .with(PromptField::TickerLower, ticker.to_lowercase())
            .with(PromptField::CompanyName, company_name.clone())
            .with(PromptField::SourceText, self.source_text.clone());
        bindings.extend(&self.bindings);
        bindings
            .bind(PromptField::Platform, self.platform.as_str())
            .bind(PromptField::MinLength, length.min.to_string())
            .bind(PromptField::MaxLength, length.max.to_string())
            .bind(PromptField::LengthUnit, length.unit.label(self.platform.is_chinese()));
        if let Some(line) = &structure.closing_line {
            bindings.bind(PromptField::ClosingLine, line.clone());
        }
        if let Some(units) = &structure.required_units {
            bindings.bind(PromptField::UnitCount, units.count.to_string());
        }
        if let Some(disclaimer) = self.disclaimer.filter(|d| !d.trim().is_empty()) {
            bindings.bind(PromptField::Disclaimer, disclaimer.clone());
            if !structure.required_phrases.contains(&disclaimer) {
                structure.required_phrases.push(disclaimer);
            }
        }

        Ok(ContentRequest {
            platform: self.platform,
            ticker,
            company_name,
            source_text: self.source_text,
            bindings,
            length,
            denylist,
            structure,
            rubric: self.rubric,
            fabrication_severity: self.fabrication_severity,
        })
    }
}
