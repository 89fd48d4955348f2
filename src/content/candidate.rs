//! Generated candidates: plain text or a structured JSON payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::LengthUnit;

/// What the generator produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    /// Slide deck (`title`, `slides`, `caption`) or video script
    /// (`title`, `script`, `description`)
    Structured(Value),
}

/// One generated output for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    round: u32,
    strategy: String,
    payload: Payload,
    /// Flattened text that checks and the evaluator read
    text: String,
}

impl Candidate {
    pub fn text(round: u32, strategy: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            round,
            strategy: strategy.into(),
            text: body.clone(),
            payload: Payload::Text(body),
        }
    }

    pub fn structured(round: u32, strategy: impl Into<String>, value: Value) -> Self {
        Self {
            round,
            strategy: strategy.into(),
            text: flatten(&value),
            payload: Payload::Structured(value),
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Name of the strategy that produced this candidate
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Flattened text view
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Publishable body: the text itself, or pretty-printed JSON
    pub fn body(&self) -> String {
        match &self.payload {
            Payload::Text(text) => text.clone(),
            Payload::Structured(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        }
    }

    /// Length of the content alone, without the labels added when flattening
    pub fn measure(&self, unit: LengthUnit) -> usize {
        match &self.payload {
            Payload::Text(text) => unit.measure(text),
            Payload::Structured(value) => content_parts(value).iter().map(|part| unit.measure(part)).sum(),
        }
    }

    /// Number of discrete sub-units: the `slides` array for JSON payloads,
    /// occurrences of `marker` for text. `None` when neither applies.
    pub fn unit_count(&self, marker: Option<&str>) -> Option<usize> {
        match (&self.payload, marker) {
            (Payload::Structured(value), _) => value.get("slides").and_then(Value::as_array).map(Vec::len),
            (Payload::Text(text), Some(marker)) if !marker.is_empty() => Some(text.matches(marker).count()),
            _ => None,
        }
    }
}

/// Flatten a structured payload into labeled paragraphs
pub fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join("\n\n"),
        Value::Object(map) => {
            let mut parts = Vec::new();
            if let Some(title) = map.get("title") {
                parts.push(format!("Title: {}", flatten(title)));
            }
            if let Some(slides) = map.get("slides").and_then(Value::as_array) {
                for (i, slide) in slides.iter().enumerate() {
                    parts.push(format!("Slide {}: {}", i + 1, flatten(slide)));
                }
            }
            for (key, label) in [("caption", "Caption"), ("script", "Script"), ("description", "Description")] {
                if let Some(v) = map.get(key) {
                    parts.push(format!("{}: {}", label, flatten(v)));
                }
            }
            parts.join("\n\n")
        }
        other => other.to_string(),
    }
}

/// The strings `flatten` would emit, unlabeled
fn content_parts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(content_parts).collect(),
        Value::Object(map) => ["title", "slides", "caption", "script", "description"]
            .iter()
            .filter_map(|key| map.get(*key))
            .flat_map(content_parts)
            .collect(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_candidate() {
        let c = Candidate::text(2, "single_pass", "hello world");
        assert_eq!(c.round(), 2);
        assert_eq!(c.strategy(), "single_pass");
        assert_eq!(c.as_text(), "hello world");
        assert_eq!(c.body(), "hello world");
        assert_eq!(c.unit_count(None), None);
    }

    #[test]
    fn test_flatten_slides() {
        let value = json!({
            "title": "HBM 吃紧",
            "slides": ["第一页", "第二页"],
            "caption": "配文"
        });
        assert_eq!(
            flatten(&value),
            "Title: HBM 吃紧\n\nSlide 1: 第一页\n\nSlide 2: 第二页\n\nCaption: 配文"
        );
    }

    #[test]
    fn test_flatten_script() {
        let value = json!({"title": "T", "script": "S", "description": "D"});
        assert_eq!(flatten(&value), "Title: T\n\nScript: S\n\nDescription: D");
    }

    #[test]
    fn test_structured_unit_count() {
        let c = Candidate::structured(1, "single_pass", json!({"slides": ["a", "b", "c"]}));
        assert_eq!(c.unit_count(None), Some(3));
        assert_eq!(c.unit_count(Some("---")), Some(3));

        let no_slides = Candidate::structured(1, "s", json!({"script": "x"}));
        assert_eq!(no_slides.unit_count(None), None);
    }

    #[test]
    fn test_text_unit_count_by_marker() {
        let c = Candidate::text(1, "s", "【1】a\n【2】b\n");
        assert_eq!(c.unit_count(Some("【")), Some(2));
        assert_eq!(c.unit_count(Some("")), None);
    }

    #[test]
    fn test_measure_ignores_flatten_labels() {
        let c = Candidate::structured(1, "s", json!({"title": "two words", "slides": ["one", "three more words"]}));
        assert!(c.as_text().contains("Slide 1:"));
        assert_eq!(c.measure(LengthUnit::Words), 6);

        let text = Candidate::text(1, "s", "Title: kept as written");
        assert_eq!(text.measure(LengthUnit::Words), 4);
    }

    #[test]
    fn test_structured_body_is_json() {
        let c = Candidate::structured(1, "s", json!({"title": "T"}));
        let parsed: Value = serde_json::from_str(&c.body()).unwrap();
        assert_eq!(parsed["title"], "T");
    }

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_value(Payload::Text("x".to_string())).unwrap();
        assert_eq!(json, json!({"kind": "text", "body": "x"}));
    }
}
