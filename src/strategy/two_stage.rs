//! Strategist then writer.
//!
//! The strategist call picks one content angle from the research; the writer
//! receives it as extra context. Angles are cached per platform and ticker so
//! revision rounds keep the same angle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::content::{Candidate, ContentRequest};
use crate::error::Result;
use crate::llm::{CompletionRequest, ResponseFormat, complete_with_retry, parse_json_block};
use crate::prompt::builtin::STRATEGIST_NAME;
use crate::strategy::single_pass::SinglePassStrategy;
use crate::strategy::traits::{GenerationError, GenerationStrategy};

const STRATEGIST_SYSTEM: &str = "You are a content strategist for an independent equity-research publication. \
Return only JSON.";

/// The angle a post is built around
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAngle {
    pub angle_name: String,
    pub thesis: String,
    #[serde(default)]
    pub key_data_points: Vec<String>,
}

impl ContentAngle {
    /// Writer-prompt section describing the angle
    pub fn to_prompt(&self) -> String {
        let mut out = format!(
            "## Content angle\nAngle: {}\nThesis: {}\n",
            self.angle_name.trim(),
            self.thesis.trim()
        );
        if !self.key_data_points.is_empty() {
            out.push_str("Key data points:\n");
            for point in &self.key_data_points {
                out.push_str(&format!("- {}\n", point.trim()));
            }
        }
        out.push_str("Build the whole post around this angle.");
        out
    }

    fn from_output(raw: &str) -> Option<Self> {
        let value = parse_json_block(raw)?;
        // Some models wrap a single angle in a list
        let value = match value {
            serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        let angle: ContentAngle = serde_json::from_value(value).ok()?;
        (!angle.angle_name.trim().is_empty() && !angle.thesis.trim().is_empty()).then_some(angle)
    }
}

pub struct TwoStageStrategy {
    writer: SinglePassStrategy,
    angles: Mutex<HashMap<String, ContentAngle>>,
    max_tokens: u32,
}

impl TwoStageStrategy {
    pub fn new(writer: SinglePassStrategy) -> Self {
        Self {
            writer,
            angles: Mutex::new(HashMap::new()),
            max_tokens: 2_048,
        }
    }

    fn cache_key(request: &ContentRequest) -> String {
        format!("{}:{}", request.platform(), request.ticker())
    }

    async fn angle(&self, request: &ContentRequest) -> std::result::Result<ContentAngle, GenerationError> {
        let key = Self::cache_key(request);
        if let Some(angle) = self.angles.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(angle.clone());
        }

        let prompt = self.writer.render(STRATEGIST_NAME, request)?;
        let completion = CompletionRequest::new(STRATEGIST_SYSTEM)
            .with_user_message(prompt)
            .with_max_tokens(self.max_tokens)
            .with_response_format(ResponseFormat::Json);
        let response = complete_with_retry(self.writer.client(), &completion, self.writer.retry()).await?;

        let angle = ContentAngle::from_output(&response.content)
            .ok_or_else(|| GenerationError::Unusable("strategist returned no usable angle".to_string()))?;
        info!("{} angle for {}: {}", request.platform(), request.ticker(), angle.angle_name);

        self.angles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, angle.clone());
        Ok(angle)
    }
}

#[async_trait]
impl GenerationStrategy for TwoStageStrategy {
    fn name(&self) -> &str {
        "two_stage"
    }

    fn validate(&self, request: &ContentRequest) -> Result<()> {
        self.writer.checked_template(STRATEGIST_NAME, request)?;
        self.writer.validate(request)
    }

    async fn generate(
        &self,
        request: &ContentRequest,
        revision: Option<&str>,
        round: u32,
    ) -> std::result::Result<Candidate, GenerationError> {
        let angle = self.angle(request).await?;
        let prompt = self.writer.writer_prompt(request, revision, Some(&angle.to_prompt()))?;
        self.writer.write(request, prompt, round, self.name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LengthUnit, Platform};
    use crate::llm::{MockLlmClient, RetryPolicy};
    use crate::prompt::{PromptBindings, PromptField, PromptLoader};

    fn request() -> ContentRequest {
        let mut b = PromptBindings::new();
        for field in [
            PromptField::ExecutiveSummary,
            PromptField::CoreContradiction,
            PromptField::KeyFindings,
            PromptField::FinancialSnapshot,
        ] {
            b.bind(field, "x");
        }
        ContentRequest::builder(Platform::Twitter, "AMD")
            .source_text("MI300 revenue 5,000 million.")
            .bindings(&b)
            .length(1, 500, LengthUnit::Words)
            .closing_line("Data: u")
            .build()
            .unwrap()
    }

    fn strategy(client: Arc<MockLlmClient>) -> TwoStageStrategy {
        TwoStageStrategy::new(
            SinglePassStrategy::new(client, Arc::new(PromptLoader::builtin())).with_retry(RetryPolicy::immediate(1)),
        )
    }

    const ANGLE: &str = r#"{"angle_name": "Inference pivot", "thesis": "MI300 is the story.", "key_data_points": ["5,000 million"]}"#;

    #[tokio::test]
    async fn test_angle_flows_into_writer_prompt() {
        let client = Arc::new(MockLlmClient::with_responses([ANGLE, "post body"]));
        let s = strategy(client.clone());
        let candidate = s.generate(&request(), None, 1).await.unwrap();
        assert_eq!(candidate.strategy(), "two_stage");

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].response_format, ResponseFormat::Json);
        let writer_prompt = requests[1].user_text();
        assert!(writer_prompt.contains("Angle: Inference pivot"));
        assert!(writer_prompt.contains("- 5,000 million"));
    }

    #[tokio::test]
    async fn test_angle_cached_across_rounds() {
        let client = Arc::new(MockLlmClient::with_responses([ANGLE, "first", "second"]));
        let s = strategy(client.clone());
        s.generate(&request(), None, 1).await.unwrap();
        let second = s.generate(&request(), Some("too short"), 2).await.unwrap();
        assert_eq!(second.as_text(), "second");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unusable_angle() {
        let client = Arc::new(MockLlmClient::with_responses(["I cannot pick one."]));
        let err = strategy(client).generate(&request(), None, 1).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unusable(_)));
    }

    #[test]
    fn test_angle_from_list_output() {
        let raw = format!("[{}]", ANGLE);
        let angle = ContentAngle::from_output(&raw).unwrap();
        assert_eq!(angle.angle_name, "Inference pivot");
        assert!(ContentAngle::from_output(r#"{"angle_name": "", "thesis": "x"}"#).is_none());
    }
}
