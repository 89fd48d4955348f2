//! Noise stripping for raw research markdown before it goes into a prompt

use std::sync::LazyLock;

use regex::Regex;

/// Default hard cap on preprocessed length, in characters
pub const DEFAULT_MAX_CHARS: usize = 800_000;

static DM_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[DM-[^\]]+\]").expect("dm tag regex"));

static EVIDENCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:硬数据|合理推断|主观判断)[^\]]*\]").expect("evidence tag regex"));

static DIAGRAM_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:mermaid|graph|flowchart|dot|plantuml)\s*\n.*?```").expect("diagram fence regex")
});

static BOX_ART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[│├└┌┐┘┤┬┴┼─]{3,}.*$").expect("box art regex"));

static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\|[ \t:|-]+\|$").expect("table separator regex"));

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run regex"));

/// Strip reference tags, diagrams and box art, compress tables and whitespace,
/// then cap the result at `max_chars` characters.
///
/// When capping, the text is cut at the last `## ` heading if that keeps at
/// least three quarters of the budget.
pub fn preprocess_markdown(raw: &str, max_chars: usize) -> String {
    let text = DM_TAG.replace_all(raw, "");
    let text = EVIDENCE_TAG.replace_all(&text, "");
    let text = DIAGRAM_FENCE.replace_all(&text, "");
    let text = BOX_ART.replace_all(&text, "");
    let text = TABLE_SEPARATOR.replace_all(&text, "|---|");
    let text = BLANK_RUN.replace_all(&text, "\n\n").into_owned();

    truncate_at_heading(text, max_chars)
}

fn truncate_at_heading(text: String, max_chars: usize) -> String {
    let Some((cut_byte, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let head = &text[..cut_byte];
    if let Some(heading) = head.rfind("\n## ") {
        let heading_chars = head[..heading].chars().count();
        if heading_chars > max_chars * 3 / 4 {
            return format!("{}\n\n[…报告后续章节已截断]", &head[..heading]);
        }
    }

    format!("{}\n\n[…已截断]", head)
}
