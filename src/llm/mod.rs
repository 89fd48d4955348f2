//! LLM Client Layer - Anthropic and Gemini text generation
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient and GeminiClient implementations
//! - Bounded retry with backoff
//! - Lenient JSON extraction from model output

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod json;
pub mod retry;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient};
pub use gemini::{GeminiClient, GeminiConfig};
pub use json::parse_json_block;
pub use retry::{RetryPolicy, complete_with_retry};
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, StopReason, Usage};

/// Which provider backs the writer and judge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    Gemini,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Build a shared client for the given provider.
///
/// `model` of `None` keeps the provider default.
pub fn build_client(
    provider: Provider,
    model: Option<&str>,
    max_tokens: u32,
    timeout: Duration,
    temperature: Option<f32>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    match provider {
        Provider::Anthropic => {
            let mut config = AnthropicConfig {
                max_tokens,
                timeout,
                temperature,
                ..Default::default()
            };
            if let Some(model) = model {
                config.model = model.to_string();
            }
            Ok(Arc::new(AnthropicClient::new(config)?))
        }
        Provider::Gemini => {
            let mut config = GeminiConfig {
                max_tokens,
                timeout,
                temperature,
                ..Default::default()
            };
            if let Some(model) = model {
                config.model = model.to_string();
            }
            Ok(Arc::new(GeminiClient::new(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _role = Role::User;
        let _stop = StopReason::EndTurn;
        let _format = ResponseFormat::Json;
    }

    #[test]
    fn test_provider_serde() {
        let p: Provider = serde_yaml::from_str("gemini").unwrap();
        assert_eq!(p, Provider::Gemini);
        assert_eq!(Provider::default(), Provider::Anthropic);
        assert_eq!(Provider::Gemini.to_string(), "gemini");
    }
}
