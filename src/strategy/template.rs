//! Deterministic fallback: assemble a post from the most data-dense source
//! paragraphs. Never calls the generation service.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::checks::ForbiddenTermCheck;
use crate::content::{Candidate, ContentRequest, Platform};
use crate::strategy::traits::{GenerationError, GenerationStrategy};

static DATA_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d,.]+[%$BMKx倍亿万]|\$[\d,.]+[BMK]?").expect("data token regex"));

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#*_`]").expect("markup regex"));

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-•]\s*").expect("bullet regex"));

const COMPARISON_WORDS: &[&str] = &[
    "vs", "而", "但", "相比", "增长", "下降", "增至", "降至", "同比", "环比", "较", "超过", "达到", "从", "提升",
    "versus", "compared", "grew", "fell", "rose", "up from", "down from",
];

const MIN_PARAGRAPH_CHARS: usize = 30;

/// A source paragraph and its data-density score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedParagraph {
    pub score: f64,
    pub text: String,
}

/// Rank paragraphs by numeric data density.
///
/// +2 per number token, +1 per comparison word (at most 3), +0.5 past 100
/// chars. Headings, tables, link lists, disclaimers and paragraphs with a
/// denylisted term are skipped. Ties keep source order.
pub fn rank_paragraphs(source: &str, denylist: &[String]) -> Vec<RankedParagraph> {
    let mut ranked: Vec<RankedParagraph> = source
        .split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .filter(|p| !p.starts_with('#'))
        .filter(|p| !(p.starts_with('|') && p.ends_with('|')))
        .filter(|p| !p.starts_with("- [") && !p.starts_with("* ["))
        .filter(|p| !p.contains("不构成投资建议") && !p.contains("数据来源"))
        .filter_map(|p| {
            let clean = MARKUP.replace_all(p, "");
            let clean = BULLET.replace_all(&clean, "").trim().to_string();
            if !ForbiddenTermCheck::find_matches(&clean, denylist).is_empty() {
                return None;
            }
            let numbers = DATA_TOKEN.find_iter(&clean).count() as f64;
            let lowered = clean.to_lowercase();
            let comparisons = COMPARISON_WORDS.iter().filter(|w| lowered.contains(*w)).count().min(3) as f64;
            let length_bonus = if clean.chars().count() > 100 { 0.5 } else { 0.0 };
            let score = numbers * 2.0 + comparisons + length_bonus;
            (score > 0.0).then_some(RankedParagraph { score, text: clean })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

pub struct TemplateStrategy;

impl TemplateStrategy {
    /// Highest-ranked paragraphs that fit in `budget` units of the request's length unit
    fn select(request: &ContentRequest, budget: usize) -> Vec<String> {
        let unit = request.length().unit;
        let mut used = 0;
        let mut picked = Vec::new();
        for para in rank_paragraphs(request.source_text(), request.denylist()) {
            let size = unit.measure(&para.text);
            if used + size > budget {
                if picked.is_empty() {
                    continue;
                }
                break;
            }
            used += size;
            picked.push(para.text);
        }
        picked
    }

    fn trailer(request: &ContentRequest) -> Vec<String> {
        let rules = request.structure();
        let mut out: Vec<String> = rules.required_phrases.clone();
        if let Some(closing) = &rules.closing_line {
            out.push(closing.clone());
        }
        out
    }

    fn title(request: &ContentRequest) -> String {
        if request.company_name() == request.ticker() {
            request.ticker().to_uppercase()
        } else {
            format!("{} ({})", request.company_name(), request.ticker().to_uppercase())
        }
    }
}

#[async_trait]
impl GenerationStrategy for TemplateStrategy {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(
        &self,
        request: &ContentRequest,
        _revision: Option<&str>,
        round: u32,
    ) -> Result<Candidate, GenerationError> {
        let unit = request.length().unit;
        let trailer = Self::trailer(request);
        let reserved: usize = trailer.iter().map(|t| unit.measure(t)).sum();
        let budget = request.length().max.saturating_sub(reserved);

        let paragraphs = Self::select(request, budget);
        if paragraphs.is_empty() {
            return Err(GenerationError::Unusable("no data-dense paragraphs in source".to_string()));
        }

        let candidate = match request.platform() {
            Platform::Xiaohongshu => {
                let count = request
                    .structure()
                    .required_units
                    .as_ref()
                    .map(|u| u.count)
                    .unwrap_or(paragraphs.len());
                let slides: Vec<String> = paragraphs.iter().take(count).cloned().collect();
                Candidate::structured(
                    round,
                    self.name(),
                    json!({"title": Self::title(request), "slides": slides, "caption": trailer.join("\n\n")}),
                )
            }
            Platform::YouTube => Candidate::structured(
                round,
                self.name(),
                json!({
                    "title": Self::title(request),
                    "script": paragraphs.join("\n\n"),
                    "description": trailer.join("\n\n"),
                }),
            ),
            Platform::Twitter | Platform::Xueqiu => {
                let mut sections = paragraphs;
                sections.extend(trailer);
                Candidate::text(round, self.name(), sections.join("\n\n"))
            }
        };

        Ok(candidate)
    }
}
