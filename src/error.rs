//! Error types and handling for the flight assistant

use thiserror::Error;

/// Main error type for the flight assistant
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Flight search provider errors (credential, status, transport, timeout)
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Input validation errors, including rejected tool arguments
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// AI dialogue engine errors
    #[error("Dialogue engine error: {message}")]
    Dialogue { message: String },

    /// Template store errors
    #[error("Template error: {message}")]
    Template { message: String },

    /// Static data (gazetteer, templates) errors
    #[error("Data error: {message}")]
    Data { message: String },

    /// JSON encoding/decoding errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl AssistantError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new dialogue engine error
    pub fn dialogue<S: Into<String>>(message: S) -> Self {
        Self::Dialogue {
            message: message.into(),
        }
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(message: S) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create a new data error
    pub fn data<S: Into<String>>(message: S) -> Self {
        Self::Data {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AssistantError::config("missing API key");
        assert!(matches!(config_err, AssistantError::Config { .. }));

        let provider_err = AssistantError::provider("status 500");
        assert!(matches!(provider_err, AssistantError::Provider { .. }));

        let validation_err = AssistantError::validation("destination missing");
        assert!(matches!(validation_err, AssistantError::Validation { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AssistantError = json_err.into();
        assert!(matches!(err, AssistantError::Json { .. }));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
