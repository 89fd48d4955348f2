//! Post-generation cleanup applied to model output before any check runs.
//!
//! Removes diagrams, code, box art and explicit price targets that the model
//! produced despite instructions, then optionally strips markdown markers.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static DIAGRAM_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:mermaid|graph|flowchart|dot|plantuml)[ \t]*\n.*?```").expect("diagram fence regex")
});

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)[ \t]*\n.*?```").expect("code fence regex"));

static UNFENCED_GRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:graph|flowchart)\s+(?:TD|LR|TB|RL|BT)\s*$").expect("graph header regex"));

static BOX_ART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[│├└┌┐┘┤┬┴┼─]+.*$").expect("box art regex"));

static RULE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[+\-]{3,}[ \t]*$").expect("rule regex"));

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run regex"));

static PRICE_TARGETS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"建议在?\$?[\d.]+[-–—~至到]\$?[\d.]+[^。]*(?:区间|仓位|观察)[^。]*[。]?",
        r"目标价\$?[\d.]+[^。]*[。]?",
        r"合理估值\s*(?:约|为|在)?\$?[\d.]+[^。]*[。]?",
        r"公允价值\s*(?:约|区间|为|在)?\$?[\d.]+[^。]*[。]?",
        r"[（(]约合?\$[\d.]+/股[）)]",
        r"在\$[\d.]+[-–—~至到]\$?[\d.]+(?:区间|之间)[^。]*",
        r"(?i)(?:fair value|target price|price target)\s*(?:of|is|at|:)?\s*\$[\d.]+[^.]*\.",
        r"(?i)stock should trade (?:at|between) \$[\d.]+[^.]*\.",
        r"(?i)\(\s*(?:approximately|roughly|about|~)\s*\$[\d.]+\s*/?\s*share\s*\)",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("price target regex"))
    .collect()
});

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{2}([^*]+?)\*{2}").expect("bold regex"));

static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+?)\*").expect("italic regex"));

static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+").expect("header regex"));

/// Remove diagrams and non-JSON code blocks
pub fn strip_diagrams_and_code(text: &str) -> String {
    let text = DIAGRAM_FENCE.replace_all(text, "");
    let text = CODE_FENCE.replace_all(&text, |caps: &Captures| {
        if caps[1].eq_ignore_ascii_case("json") {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let text = strip_unfenced_graphs(&text);
    let text = BOX_ART.replace_all(&text, "");
    let text = RULE_LINE.replace_all(&text, "");
    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

/// Drop `graph TD`-style blocks written without fences, up to the next blank line
fn strip_unfenced_graphs(text: &str) -> String {
    let mut out = Vec::new();
    let mut skipping = false;
    for line in text.lines() {
        if skipping {
            if line.trim().is_empty() {
                skipping = false;
                out.push(line);
            }
            continue;
        }
        if UNFENCED_GRAPH.is_match(line) {
            skipping = true;
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Remove explicit price-target language (English and Chinese)
pub fn strip_price_targets(text: &str) -> String {
    let mut text = text.to_string();
    for re in PRICE_TARGETS.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

/// Remove bold, italic and heading markers
pub fn strip_markdown_formatting(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    HEADER.replace_all(&text, "").into_owned()
}

/// Apply every filter; markdown markers are kept unless `plain_text`
pub fn clean_generated_content(text: &str, plain_text: bool) -> String {
    let text = strip_diagrams_and_code(text);
    let text = strip_price_targets(&text);
    if plain_text {
        strip_markdown_formatting(&text)
    } else {
        text
    }
}

/// Clean every string inside a JSON payload as plain text
pub fn clean_structured(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_generated_content(&s, true)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_structured).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, clean_structured(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_mermaid_and_code_keeps_json() {
        let raw = "Intro\n```mermaid\ngraph TD\nA-->B\n```\n```python\nprint(1)\n```\n```json\n{\"a\": 1}\n```\nOutro";
        let out = strip_diagrams_and_code(raw);
        assert!(!out.contains("mermaid"));
        assert!(!out.contains("print(1)"));
        assert!(out.contains("```json\n{\"a\": 1}\n```"));
        assert!(out.starts_with("Intro"));
        assert!(out.ends_with("Outro"));
    }

    #[test]
    fn test_strips_unfenced_graph_block() {
        let raw = "Before\n\ngraph LR\n  A --> B\n  B --> C\n\nAfter";
        let out = strip_diagrams_and_code(raw);
        assert_eq!(out, "Before\n\nAfter");
    }

    #[test]
    fn test_strips_box_art_and_rules() {
        let raw = "Text\n┌─────┐\n│ box │\n└─────┘\n+-----+\nMore";
        let out = strip_diagrams_and_code(raw);
        assert_eq!(out, "Text\n\nMore");
    }

    #[test]
    fn test_strips_english_price_targets() {
        let raw = "Margins expanded to 53%. Our price target is $250 based on 30x earnings. Capex keeps rising.";
        let out = strip_price_targets(raw);
        assert!(!out.contains("$250"));
        assert!(out.contains("Margins expanded to 53%."));
        assert!(out.contains("Capex keeps rising."));
    }

    #[test]
    fn test_strips_per_share_parenthetical() {
        let out = strip_price_targets("Implied value ( approximately $265/share ) looks stretched.");
        assert_eq!(out, "Implied value  looks stretched.");
    }

    #[test]
    fn test_strips_chinese_price_targets() {
        let raw = "毛利率提升至53%。目标价$300，对应30倍市盈率。风险在于需求。";
        let out = strip_price_targets(raw);
        assert!(!out.contains("目标价"));
        assert!(out.contains("毛利率提升至53%。"));
        assert!(out.contains("风险在于需求。"));
    }

    #[test]
    fn test_strip_markdown_formatting() {
        let raw = "## Heading\n**Bold** and *italic* text";
        assert_eq!(strip_markdown_formatting(raw), "Heading\nBold and italic text");
    }

    #[test]
    fn test_clean_keeps_markdown_when_not_plain() {
        let out = clean_generated_content("**Bold**", false);
        assert_eq!(out, "**Bold**");
        assert_eq!(clean_generated_content("**Bold**", true), "Bold");
    }

    #[test]
    fn test_clean_structured_recurses() {
        let value = json!({"title": "**HBM**", "slides": ["目标价$120，上行空间大。产能翻倍", "ok"], "n": 5});
        let out = clean_structured(value);
        assert_eq!(out["title"], "HBM");
        assert_eq!(out["slides"][0], "产能翻倍");
        assert_eq!(out["n"], 5);
    }
}
