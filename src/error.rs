//! Error types for Postforge
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can escape the Postforge library
#[derive(Debug, Error)]
pub enum PostforgeError {
    /// Malformed input rejected before any external call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Prompt template could not be loaded or parsed
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration could not be resolved
    #[error("Config error: {0}")]
    Config(String),

    /// Source report could not be located or read
    #[error("Source error: {0}")]
    Source(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PostforgeError {
    /// Shorthand for an `InvalidRequest` error
    pub fn invalid(message: impl Into<String>) -> Self {
        PostforgeError::InvalidRequest(message.into())
    }

    /// Whether this error signals a caller mistake rather than an environment problem
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, PostforgeError::InvalidRequest(_))
    }
}

/// Result type alias for Postforge operations
pub type Result<T> = std::result::Result<T, PostforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error() {
        let err = PostforgeError::invalid("source text is empty");
        assert_eq!(err.to_string(), "Invalid request: source text is empty");
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_template_error() {
        let err = PostforgeError::Template("unknown placeholder {{price}}".to_string());
        assert_eq!(err.to_string(), "Template error: unknown placeholder {{price}}");
        assert!(!err.is_invalid_request());
    }

    #[test]
    fn test_source_error() {
        let err = PostforgeError::Source("no report for tsla".to_string());
        assert_eq!(err.to_string(), "Source error: no report for tsla");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PostforgeError = io_err.into();
        assert!(matches!(err, PostforgeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: PostforgeError = json_err.into();
        assert!(matches!(err, PostforgeError::Json(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: [a list").unwrap_err();
        let err: PostforgeError = yaml_err.into();
        assert!(matches!(err, PostforgeError::Yaml(_)));
    }
}
