//! LLM types for text-generation requests and responses
//!
//! Provider-neutral message types. Each client maps them onto its own wire
//! format.

use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What shape of answer the caller expects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Request to the LLM for completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Create a new request with a system prompt
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }

    /// Add a user message
    pub fn with_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override the client's default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the expected response format
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// All user message content joined, in order
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Why the model stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    Filtered,
}

/// Token usage for a completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Create new usage stats
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Add another usage to this one
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// Total tokens used
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
    pub model: String,
}

impl CompletionResponse {
    /// Plain text response that ended normally
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            model: model.into(),
        }
    }

    /// Whether the model was cut off by the token limit
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hello");

        let assistant = Message::assistant("hi");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_response_format_default_is_text() {
        assert_eq!(ResponseFormat::default(), ResponseFormat::Text);
        assert_eq!(serde_json::to_string(&ResponseFormat::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("You are a writer")
            .with_user_message("Write a post")
            .with_max_tokens(2048)
            .with_temperature(0.7)
            .with_model("gemini-2.5-pro")
            .with_response_format(ResponseFormat::Json);

        assert_eq!(request.system, "You are a writer");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, Some(2048));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(request.response_format, ResponseFormat::Json);
    }

    #[test]
    fn test_user_text_joins_user_messages_only() {
        let mut request = CompletionRequest::new("sys").with_user_message("first");
        request.messages.push(Message::assistant("ignored"));
        request.messages.push(Message::user("second"));
        assert_eq!(request.user_text(), "first\n\nsecond");
    }

    #[test]
    fn test_usage_add_and_total() {
        let mut usage = Usage::new(100, 50);
        usage.add(&Usage::new(10, 5));
        assert_eq!(usage.input_tokens, 110);
        assert_eq!(usage.output_tokens, 55);
        assert_eq!(usage.total(), 165);
    }

    #[test]
    fn test_completion_response_truncated() {
        let mut response = CompletionResponse::text("partial", "m");
        assert!(!response.is_truncated());
        response.stop_reason = StopReason::MaxTokens;
        assert!(response.is_truncated());
    }
}
