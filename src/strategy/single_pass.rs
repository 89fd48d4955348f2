//! One writer call per round from the platform's prompt template.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::content::{Candidate, ContentRequest, clean_generated_content, clean_structured};
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, ResponseFormat, RetryPolicy, complete_with_retry, parse_json_block};
use crate::prompt::{PromptLoader, PromptRenderer, PromptTemplate};
use crate::strategy::traits::{GenerationError, GenerationStrategy};

const WRITER_SYSTEM: &str = "You write social posts for an independent equity-research publication. \
Follow every rule in the prompt exactly. Use only figures that appear in the supplied research.";

/// Prefix the prompt with the previous round's problems
pub fn revision_preamble(revision: &str) -> String {
    format!(
        "REWRITE REQUIRED: your previous output was rejected.\nIssues found:\n{}\n\
         Fix ALL issues. Do NOT repeat the same mistakes.\n\n",
        revision.trim()
    )
}

/// Renders the platform template and asks the service for the post
pub struct SinglePassStrategy {
    client: Arc<dyn LlmClient>,
    loader: Arc<PromptLoader>,
    renderer: PromptRenderer,
    retry: RetryPolicy,
    max_tokens: u32,
}

impl SinglePassStrategy {
    pub fn new(client: Arc<dyn LlmClient>, loader: Arc<PromptLoader>) -> Self {
        Self {
            client,
            loader,
            renderer: PromptRenderer::new(),
            retry: RetryPolicy::default(),
            max_tokens: 8_192,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn client(&self) -> &dyn LlmClient {
        self.client.as_ref()
    }

    pub(crate) fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Load `name` and check the request binds everything it needs
    pub(crate) fn checked_template(&self, name: &str, request: &ContentRequest) -> Result<PromptTemplate> {
        let template = self.loader.load(name)?;
        // Rendering reports every unbound field; nothing is sent here
        self.renderer.render(&template, request.bindings())?;
        Ok(template)
    }

    pub(crate) fn render(&self, name: &str, request: &ContentRequest) -> std::result::Result<String, GenerationError> {
        let template = self
            .loader
            .load(name)
            .map_err(|e| GenerationError::Prompt(e.to_string()))?;
        self.renderer
            .render(&template, request.bindings())
            .map_err(|e| GenerationError::Prompt(e.to_string()))
    }

    /// Build the writer prompt: revision preamble, template, optional extra context
    pub(crate) fn writer_prompt(
        &self,
        request: &ContentRequest,
        revision: Option<&str>,
        context: Option<&str>,
    ) -> std::result::Result<String, GenerationError> {
        let mut prompt = String::new();
        if let Some(revision) = revision.filter(|r| !r.trim().is_empty()) {
            prompt.push_str(&revision_preamble(revision));
        }
        prompt.push_str(&self.render(request.platform().as_str(), request)?);
        if let Some(context) = context {
            prompt.push_str("\n\n");
            prompt.push_str(context);
        }
        Ok(prompt)
    }

    /// Call the writer and turn its answer into a cleaned candidate
    pub(crate) async fn write(
        &self,
        request: &ContentRequest,
        prompt: String,
        round: u32,
        strategy: &str,
    ) -> std::result::Result<Candidate, GenerationError> {
        let structured = request.platform().is_structured();
        let format = if structured { ResponseFormat::Json } else { ResponseFormat::Text };
        let completion = CompletionRequest::new(WRITER_SYSTEM)
            .with_user_message(prompt)
            .with_max_tokens(self.max_tokens)
            .with_response_format(format);

        let response = complete_with_retry(self.client.as_ref(), &completion, &self.retry).await?;
        if response.is_truncated() {
            warn!("{} output for {} hit the token limit", strategy, request.ticker());
        }

        if structured {
            let value = parse_json_block(&response.content)
                .filter(|v| v.is_object())
                .ok_or_else(|| GenerationError::Unusable("expected a JSON object".to_string()))?;
            return Ok(Candidate::structured(round, strategy, clean_structured(value)));
        }

        let raw = response.content.trim().trim_matches(|c| c == '"' || c == '\'');
        let text = clean_generated_content(raw, request.wants_plain_text());
        if text.trim().is_empty() {
            return Err(GenerationError::Unusable("empty text after cleaning".to_string()));
        }
        debug!("{} produced {} chars for round {}", strategy, text.chars().count(), round);
        Ok(Candidate::text(round, strategy, text))
    }
}

#[async_trait]
impl GenerationStrategy for SinglePassStrategy {
    fn name(&self) -> &str {
        "single_pass"
    }

    fn validate(&self, request: &ContentRequest) -> Result<()> {
        self.checked_template(request.platform().as_str(), request).map(|_| ())
    }

    async fn generate(
        &self,
        request: &ContentRequest,
        revision: Option<&str>,
        round: u32,
    ) -> std::result::Result<Candidate, GenerationError> {
        let prompt = self.writer_prompt(request, revision, None)?;
        self.write(request, prompt, round, self.name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LengthUnit, Payload, Platform};
    use crate::llm::{LlmError, MockLlmClient};
    use crate::prompt::{PromptBindings, PromptField};

    fn bindings() -> PromptBindings {
        let mut b = PromptBindings::new();
        for field in [
            PromptField::ExecutiveSummary,
            PromptField::CoreContradiction,
            PromptField::KeyFindings,
            PromptField::FinancialSnapshot,
            PromptField::BullCase,
            PromptField::BearCase,
        ] {
            b.bind(field, format!("{} text", field));
        }
        b
    }

    fn request(platform: Platform) -> ContentRequest {
        ContentRequest::builder(platform, "NVDA")
            .source_text("Revenue rose 154%.")
            .bindings(&bindings())
            .length(1, 500, LengthUnit::Words)
            .closing_line("Data: https://x.io/nvda")
            .build()
            .unwrap()
    }

    fn strategy(client: Arc<MockLlmClient>) -> SinglePassStrategy {
        SinglePassStrategy::new(client, Arc::new(PromptLoader::builtin())).with_retry(RetryPolicy::immediate(2))
    }

    #[tokio::test]
    async fn test_generates_cleaned_text() {
        let client = Arc::new(MockLlmClient::with_responses(["\"**Revenue** rose 154%.\nData: https://x.io/nvda\""]));
        let candidate = strategy(client.clone())
            .generate(&request(Platform::Twitter), None, 1)
            .await
            .unwrap();
        assert_eq!(candidate.as_text(), "Revenue rose 154%.\nData: https://x.io/nvda");
        assert_eq!(candidate.strategy(), "single_pass");

        let sent = &client.requests()[0];
        assert_eq!(sent.response_format, ResponseFormat::Text);
        assert!(sent.user_text().contains("Revenue rose 154%."));
        assert!(!sent.user_text().contains("REWRITE REQUIRED"));
    }

    #[tokio::test]
    async fn test_revision_is_prepended() {
        let client = Arc::new(MockLlmClient::with_responses(["ok text"]));
        strategy(client.clone())
            .generate(&request(Platform::Twitter), Some("- [length] too long"), 2)
            .await
            .unwrap();
        let prompt = client.requests()[0].user_text();
        assert!(prompt.starts_with("REWRITE REQUIRED"));
        assert!(prompt.contains("- [length] too long"));
    }

    #[tokio::test]
    async fn test_structured_platform_parses_json() {
        let client = Arc::new(MockLlmClient::with_responses([
            "```json\n{\"title\": \"**T**\", \"script\": \"S\", \"description\": \"D\"}\n```",
        ]));
        let candidate = strategy(client.clone())
            .generate(&request(Platform::YouTube), None, 1)
            .await
            .unwrap();
        match candidate.payload() {
            Payload::Structured(v) => assert_eq!(v["title"], "T"),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(client.requests()[0].response_format, ResponseFormat::Json);
    }

    #[tokio::test]
    async fn test_structured_platform_rejects_prose() {
        let client = Arc::new(MockLlmClient::with_responses(["Sorry, here is a script without JSON."]));
        let err = strategy(client)
            .generate(&request(Platform::YouTube), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unusable(_)));
    }

    #[tokio::test]
    async fn test_service_errors_propagate_after_retry() {
        let client = Arc::new(MockLlmClient::failing(LlmError::Network("reset".to_string())));
        let err = strategy(client.clone())
            .generate(&request(Platform::Twitter), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Llm(LlmError::Network(_))));
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_validate_reports_unbound_fields() {
        let client = Arc::new(MockLlmClient::new());
        let bare = ContentRequest::builder(Platform::Twitter, "NVDA")
            .source_text("s")
            .length(1, 10, LengthUnit::Words)
            .build()
            .unwrap();
        let err = strategy(client).validate(&bare).unwrap_err();
        assert!(err.is_invalid_request());
        assert!(err.to_string().contains("executive_summary"));
        assert!(err.to_string().contains("closing_line"));
    }
}
