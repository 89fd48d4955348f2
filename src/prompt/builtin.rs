//! Built-in prompt templates, used when no templates directory overrides them

/// Name of the angle-finding template used by two-stage generation
pub const STRATEGIST_NAME: &str = "strategist";

/// Angle-finding prompt for the first stage of two-stage generation
pub const STRATEGIST: &str = r#"You are a content strategist for an independent equity-research publication.

Read the research on {{company_name}} ({{ticker}}) below and pick the single most
surprising, data-backed angle for a {{platform}} post.

Respond with JSON only:
{"angle_name": "...", "thesis": "one sentence", "key_data_points": ["...", "..."]}

Use only figures that appear in the research.

## Core contradiction
{{core_contradiction}}

## Key findings
{{key_findings}}

## Research
{{source_text}}
"#;

const TWITTER: &str = r#"Write an English long-form X (Twitter) post about {{company_name}} ({{ticker}}).

Rules:
- Length: {{min_length}} to {{max_length}} {{length_unit}}.
- Plain text. No markdown, no code blocks, no diagrams.
- No price targets, no buy/sell/hold calls, no claims that the stock is over- or undervalued.
- Every number must come from the research below.
- The final line must be exactly:
{{closing_line}}

## Executive summary
{{executive_summary}}

## Core contradiction
{{core_contradiction}}

## Key findings
{{key_findings}}

## Financial snapshot
{{financial_snapshot}}

## Research
{{source_text}}
"#;

const XUEQIU: &str = r#"请为雪球撰写一篇关于 {{company_name}}（{{ticker}}）的深度长文。

要求：
- 篇幅 {{min_length}} 到 {{max_length}} {{length_unit}}。
- 纯文本，不使用 markdown、代码块或图表。
- 不给出目标价，不给出买入/卖出/持有建议，不判断估值高低。
- 所有数字必须来自下方研究材料。
- 文末必须附上以下免责声明原文：
{{disclaimer}}

## 核心矛盾
{{core_contradiction}}

## 关键发现
{{key_findings}}

## 财务快照
{{financial_snapshot}}

## 风险因素
{{risk_factors}}

## 看多逻辑
{{bull_case}}

## 看空逻辑
{{bear_case}}

## 研究原文
{{source_text}}
"#;

const XIAOHONGSHU: &str = r#"为小红书制作一组关于 {{company_name}}（{{ticker}}）的图文卡片。

以 JSON 返回：
{"title": "不超过20字的标题", "slides": ["第1页文字", "..."], "caption": "正文配文"}

要求：
- slides 恰好 {{unit_count}} 页。
- 全部内容合计 {{min_length}} 到 {{max_length}} {{length_unit}}。
- 不给出目标价或买卖建议，所有数字来自研究材料。

## 核心矛盾
{{core_contradiction}}

## 关键发现
{{key_findings}}

## 研究原文
{{source_text}}
"#;

const YOUTUBE: &str = r#"Write a YouTube video script about {{company_name}} ({{ticker}}).

Respond with JSON only:
{"title": "...", "script": "full narration", "description": "video description"}

Rules:
- Total length {{min_length}} to {{max_length}} {{length_unit}}.
- No price targets or buy/sell/hold calls. Every number must come from the research.
- End the description with:
{{closing_line}}

## Core contradiction
{{core_contradiction}}

## Key findings
{{key_findings}}

## Bull case
{{bull_case}}

## Bear case
{{bear_case}}

## Research
{{source_text}}
"#;

/// Look up a built-in template body by name
pub fn template(name: &str) -> Option<&'static str> {
    match name {
        STRATEGIST_NAME => Some(STRATEGIST),
        "twitter" => Some(TWITTER),
        "xueqiu" => Some(XUEQIU),
        "xiaohongshu" => Some(XIAOHONGSHU),
        "youtube" => Some(YOUTUBE),
        _ => None,
    }
}

/// Names of all built-in templates
pub fn names() -> &'static [&'static str] {
    &["strategist", "twitter", "xiaohongshu", "xueqiu", "youtube"]
}
