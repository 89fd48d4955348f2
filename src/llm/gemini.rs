//! Gemini API client implementation
//!
//! Implements the LlmClient trait against the `generateContent` endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{CompletionRequest, CompletionResponse, ResponseFormat, Role, StopReason, Usage};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Checked in order; the first one set wins
pub const API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
            temperature: None,
        }
    }
}

impl GeminiConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
    usage: Arc<Mutex<Usage>>,
}

impl GeminiClient {
    /// Create a client from GEMINI_API_KEY or GOOGLE_API_KEY
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let api_key = API_KEY_ENVS
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| LlmError::MissingApiKey {
                env_var: API_KEY_ENVS.join(" or "),
            })?;

        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: String, config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
            usage: Arc::new(Mutex::new(Usage::default())),
        })
    }

    fn endpoint(model: &str) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, model)
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    },
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut generation_config = json!({
            "maxOutputTokens": request.max_tokens.unwrap_or(self.config.max_tokens),
        });
        if let Some(temperature) = request.temperature.or(self.config.temperature) {
            generation_config["temperature"] = json!(temperature);
        }
        if request.response_format == ResponseFormat::Json {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if !request.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": request.system }] });
        }

        body
    }

    fn parse_response(&self, body: Value, model: String) -> Result<CompletionResponse, LlmError> {
        let usage = body
            .get("usageMetadata")
            .map(|u| {
                Usage::new(
                    u["promptTokenCount"].as_u64().unwrap_or(0),
                    u["candidatesTokenCount"].as_u64().unwrap_or(0),
                )
            })
            .unwrap_or_default();

        {
            let mut total = self.usage.lock().unwrap_or_else(|e| e.into_inner());
            total.add(&usage);
        }

        let candidate = body["candidates"]
            .get(0)
            .ok_or_else(|| LlmError::InvalidResponse("response has no candidates".to_string()))?;

        let stop_reason = match candidate["finishReason"].as_str() {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                StopReason::Filtered
            }
            _ => StopReason::EndTurn,
        };

        let content = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse(format!(
                "candidate has no text (finishReason: {})",
                candidate["finishReason"].as_str().unwrap_or("unknown")
            )));
        }

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
            model,
        })
    }

    async fn send_request(&self, model: &str, body: Value) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(Self::endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.config.timeout))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::from_status(status.as_u16(), retry_after, error_body));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    pub fn total_usage(&self) -> Usage {
        self.usage.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request.model.clone().unwrap_or_else(|| self.config.model.clone());
        let body = self.build_request(&request);
        let response = self.send_request(&model, body).await?;
        self.parse_response(response, model)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}
