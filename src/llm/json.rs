//! Lenient JSON extraction from model output.
//!
//! Models wrap JSON in markdown fences or chat around it. Try the cleaned text
//! as-is first, then fall back to the outermost `{...}` or `[...]` span.

use serde_json::Value;

/// Strip a leading ```` ``` ```` / ```` ```json ```` fence and its closing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Best-effort parse of a JSON value embedded in model output
pub fn parse_json_block(raw: &str) -> Option<Value> {
    let cleaned = strip_code_fence(raw);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (cleaned.find(open), cleaned.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}
