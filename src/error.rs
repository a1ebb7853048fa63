//! Domain-specific error types for veracity

use serde_json::json;
use thiserror::Error;

/// Main error type for the claim verification pipeline
#[derive(Error, Debug)]
pub enum VeracityError {
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VeracityError {
    pub fn input(message: impl Into<String>) -> Self {
        VeracityError::Input {
            message: message.into(),
        }
    }

    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        VeracityError::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// True for errors the caller caused; everything else is absorbed by the pipeline.
    pub fn is_input(&self) -> bool {
        matches!(self, VeracityError::Input { .. })
    }

    /// JSON body used by the HTTP front end
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "error": self.to_string() })
    }
}

impl From<anyhow::Error> for VeracityError {
    fn from(err: anyhow::Error) -> Self {
        VeracityError::Internal {
            message: format!("{err:#}"),
        }
    }
}

impl From<serde_json::Error> for VeracityError {
    fn from(err: serde_json::Error) -> Self {
        VeracityError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for VeracityError {
    fn from(err: reqwest::Error) -> Self {
        VeracityError::Collaborator {
            collaborator: "http".to_string(),
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<surrealdb::Error> for VeracityError {
    fn from(err: surrealdb::Error) -> Self {
        VeracityError::Collaborator {
            collaborator: "store".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for VeracityError {
    fn from(err: toml::de::Error) -> Self {
        VeracityError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for veracity operations
pub type Result<T> = std::result::Result<T, VeracityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_error_names_the_collaborator() {
        let err = VeracityError::collaborator("search", "429 rate limited");
        assert_eq!(err.to_string(), "search failed: 429 rate limited");
        assert!(!err.is_input());
    }

    #[test]
    fn input_error_renders_as_json_body() {
        let err = VeracityError::input("Claim is required");
        assert!(err.is_input());
        assert_eq!(err.to_json()["error"], "Input error: Claim is required");
    }
}
