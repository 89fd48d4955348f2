//! Research report loading: JSON reports, markdown reports, and discovery on disk

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PostforgeError, Result};
use crate::prompt::{PromptBindings, PromptField};
use crate::source::preprocess::{DEFAULT_MAX_CHARS, preprocess_markdown};

/// Placeholder for report sections that could not be extracted
const NONE_AVAILABLE: &str = "(none available)";

/// Section text cap when the next heading is missing
const SECTION_FALLBACK_CHARS: usize = 3000;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})\s+(.*)$").expect("heading regex"));

static NUMBERED_FINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s*\*\*(.+?)\*\*[:：]\s*(.+)$").expect("finding regex"));

static BOLD_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*[:：]\s*(.+?)(?:\n|$)").expect("bold colon regex"));

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-•]\s*(.+)$").expect("bullet regex"));

static CONTRADICTION_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^>\s*\*\*(.+?)\*\*\s*---\s*(.+?)$").expect("contradiction regex"));

static FILE_TICKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z]{1,5})_").expect("ticker regex"));

static SNAPSHOT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("pe_ttm", r"(?i)PE\s*(?:TTM)?\s*[:=]?\s*([\d.]+)x?"),
        ("ps_ttm", r"(?i)PS\s*(?:TTM)?\s*[:=]?\s*([\d.]+)x?"),
        ("roe", r"(?i)ROE\s*[:=]?\s*([\d.]+)%"),
        ("roic", r"(?i)ROIC\s*[:=]?\s*([\d.]+)%"),
        ("gross_margin", r"(?i)(?:毛利率|Gross\s*Margin|GM)\s*[:=]?\s*([\d.]+)%"),
        ("net_margin", r"(?i)(?:净利率|Net\s*(?:Profit\s*)?Margin|NPM)\s*[:=]?\s*([\d.]+)%"),
        ("fcf", r"(?i)(?:FCF|自由现金流)\s*[:=]?\s*\$?([-\d.]+[BMK]?)"),
    ]
    .into_iter()
    .map(|(key, pattern)| (key, Regex::new(pattern).expect("snapshot regex")))
    .collect()
});

/// A parsed research report: the raw material every post is written from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceDocument {
    pub ticker: String,
    pub company_name: String,
    pub executive_summary: String,
    pub core_contradiction: String,
    pub key_findings: Vec<String>,
    pub financial_snapshot: BTreeMap<String, String>,
    pub risk_factors: Vec<String>,
    pub bull_case: String,
    pub bear_case: String,
    pub raw_markdown: String,
}

impl SourceDocument {
    /// Load a structured JSON report
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PostforgeError::Source(format!("Failed to read {}: {}", path.display(), e)))?;
        let doc: SourceDocument = serde_json::from_str(&content)?;
        Ok(doc)
    }

    /// Extract a report from markdown by scanning headings and tables
    pub fn from_markdown(text: &str, ticker: &str) -> Self {
        let company_name = first_table_value(text, &["公司", "Company"]).unwrap_or_default();

        let core_contradiction = match CONTRADICTION_QUOTE.captures(text) {
            Some(caps) => format!("{}: {}", &caps[1], caps[2].trim()),
            None => extract_section(text, &["核心矛盾", "core contradiction"]),
        };

        Self {
            ticker: ticker.to_uppercase(),
            company_name,
            executive_summary: extract_section(
                text,
                &["核心结论速览", "报告总览", "executive summary", "核心矛盾", "core contradiction"],
            ),
            core_contradiction,
            key_findings: extract_key_findings(text),
            financial_snapshot: extract_financial_snapshot(text),
            risk_factors: extract_risk_factors(text),
            bull_case: extract_section(text, &["bull case", "多头情景", "乐观情景"]),
            bear_case: extract_section(text, &["bear case", "空头情景", "悲观情景"]),
            raw_markdown: text.to_string(),
        }
    }

    /// Load a report from a `.json` or markdown file
    ///
    /// The ticker is taken from the document, then the file name
    /// (`TSM_Complete.md`), then `ticker_hint`.
    pub fn load(path: &Path, ticker_hint: &str) -> Result<Self> {
        if path.extension().is_some_and(|ext| ext == "json") {
            let mut doc = Self::from_json_file(path)?;
            if doc.ticker.is_empty() {
                doc.ticker = ticker_hint.to_uppercase();
            }
            return Ok(doc);
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| PostforgeError::Source(format!("Failed to read {}: {}", path.display(), e)))?;
        let ticker = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| FILE_TICKER.captures(stem).map(|c| c[1].to_string()))
            .unwrap_or_else(|| ticker_hint.to_string());

        log::info!("Parsing markdown report {}", path.display());
        Ok(Self::from_markdown(&text, &ticker))
    }

    /// Find and load the report for `ticker` under `<reports_dir>/<ticker_lower>/`
    ///
    /// `report.json` wins over markdown.
    pub fn locate(reports_dir: &Path, ticker: &str) -> Result<Self> {
        let dir = reports_dir.join(ticker.to_lowercase());
        let json = dir.join("report.json");
        if json.is_file() {
            return Self::load(&json, ticker);
        }

        match find_markdown_report(&dir)? {
            Some(path) => Self::load(&path, ticker),
            None => Err(PostforgeError::Source(format!(
                "no report for {} in {}",
                ticker,
                dir.display()
            ))),
        }
    }

    /// The full report text: raw markdown when present, otherwise the sections joined
    pub fn full_text(&self) -> String {
        if !self.raw_markdown.trim().is_empty() {
            return self.raw_markdown.clone();
        }

        let mut parts = Vec::new();
        let mut push = |title: &str, body: String| {
            if !body.trim().is_empty() {
                parts.push(format!("## {}\n\n{}", title, body));
            }
        };
        push("Executive Summary", self.executive_summary.clone());
        push("Core Contradiction", self.core_contradiction.clone());
        push("Key Findings", bullet_list(&self.key_findings));
        push("Financial Snapshot", self.snapshot_text());
        push("Risk Factors", bullet_list(&self.risk_factors));
        push("Bull Case", self.bull_case.clone());
        push("Bear Case", self.bear_case.clone());
        parts.join("\n\n")
    }

    /// Source text for prompts and the fabrication guard
    pub fn source_text(&self) -> String {
        preprocess_markdown(&self.full_text(), DEFAULT_MAX_CHARS)
    }

    fn snapshot_text(&self) -> String {
        self.financial_snapshot
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Prompt bindings for every report-derived field
    pub fn bindings(&self, report_url: &str) -> PromptBindings {
        let or_none = |s: String| if s.trim().is_empty() { NONE_AVAILABLE.to_string() } else { s };
        let company = if self.company_name.trim().is_empty() {
            self.ticker.clone()
        } else {
            self.company_name.clone()
        };

        PromptBindings::new()
            .with(PromptField::Ticker, self.ticker.to_uppercase())
            .with(PromptField::TickerLower, self.ticker.to_lowercase())
            .with(PromptField::CompanyName, company)
            .with(PromptField::ExecutiveSummary, or_none(self.executive_summary.clone()))
            .with(PromptField::CoreContradiction, or_none(self.core_contradiction.clone()))
            .with(PromptField::KeyFindings, or_none(bullet_list(&self.key_findings)))
            .with(PromptField::FinancialSnapshot, or_none(self.snapshot_text()))
            .with(PromptField::RiskFactors, or_none(bullet_list(&self.risk_factors)))
            .with(PromptField::BullCase, or_none(self.bull_case.clone()))
            .with(PromptField::BearCase, or_none(self.bear_case.clone()))
            .with(PromptField::SourceText, self.source_text())
            .with(PromptField::ReportUrl, report_url)
    }
}

/// Newest `*.md` file in `dir`, ignoring README.md
pub fn find_markdown_report(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let pattern = dir.join("*.md");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| PostforgeError::Source(format!("non-UTF-8 path: {}", dir.display())))?;

    let entries = glob::glob(pattern).map_err(|e| PostforgeError::Source(format!("bad glob pattern: {}", e)))?;

    let newest = entries
        .flatten()
        .filter(|p| p.file_name().is_some_and(|n| n != "README.md"))
        .filter_map(|p| {
            let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        .map(|(_, p)| p);

    Ok(newest)
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|i| format!("- {}", i)).collect::<Vec<_>>().join("\n")
}

/// Body of the first `##`/`###` heading containing any keyword (case-insensitive)
fn extract_section(text: &str, keywords: &[&str]) -> String {
    let headings: Vec<_> = HEADING.captures_iter(text).collect();

    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        for (idx, caps) in headings.iter().enumerate() {
            let level = caps[1].len();
            if !(2..=3).contains(&level) || !caps[2].to_lowercase().contains(&keyword) {
                continue;
            }

            let Some(whole) = caps.get(0) else { continue };
            let start = whole.end();
            let end = headings[idx + 1..]
                .iter()
                .find(|next| next[1].len() <= level)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or_else(|| {
                    text[start..]
                        .char_indices()
                        .nth(SECTION_FALLBACK_CHARS)
                        .map(|(i, _)| start + i)
                        .unwrap_or(text.len())
                });
            return text[start..end].trim().to_string();
        }
    }

    String::new()
}

fn extract_key_findings(text: &str) -> Vec<String> {
    let section = extract_section(text, &["核心发现", "key findings", "本章核心发现"]);
    let mut findings: Vec<String> = NUMBERED_FINDING
        .captures_iter(&section)
        .map(|c| format!("{}: {}", &c[1], c[2].trim()))
        .collect();

    if findings.is_empty() {
        let head: String = text.chars().take(5000).collect();
        findings = BOLD_COLON
            .captures_iter(&head)
            .map(|c| format!("{}: {}", &c[1], c[2].trim()))
            .collect();
    }

    findings.truncate(10);
    findings
}

fn extract_risk_factors(text: &str) -> Vec<String> {
    let section = extract_section(text, &["风险", "risk"]);
    let mut risks: Vec<String> = BULLET
        .captures_iter(&section)
        .map(|c| c[1].replace("**", "").trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    risks.truncate(10);
    risks
}

fn extract_financial_snapshot(text: &str) -> BTreeMap<String, String> {
    let head: String = text.chars().take(8000).collect();
    SNAPSHOT_PATTERNS
        .iter()
        .filter_map(|(key, re)| re.captures(&head).map(|c| (key.to_string(), c[1].to_string())))
        .collect()
}

/// First value cell of a table row whose key cell starts with one of `keys`
fn first_table_value(text: &str, keys: &[&str]) -> Option<String> {
    for key in keys {
        let pattern = format!(r"(?i)\|\s*\**{}[^|]*\**\s*\|\s*(.+?)\s*\|", regex::escape(key));
        let Ok(re) = Regex::new(&pattern) else { continue };
        if let Some(caps) = re.captures(text) {
            let value = DM_REF.replace_all(caps[1].trim().trim_matches('*').trim(), "");
            return Some(value.trim().to_string());
        }
    }
    None
}

static DM_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[DM-[A-Z]+-\d+\]").expect("dm ref regex"));
