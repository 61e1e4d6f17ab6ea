use thiserror::Error;

/// Errors that can occur when dispatching a chat generation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    /// The model or its access configuration could not be resolved.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A payload failed schema validation (first offending field or union arm).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Any upstream failure while producing particles. Displays the bare message.
    #[error("{0}")]
    Transport(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The generation was cancelled by the user or programmatically.
    #[error("Generation aborted")]
    Aborted,
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(message.into())
    }

    /// Whether this error represents a user or programmatic cancellation.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Whether this error is a caller configuration problem, surfaced before streaming.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::ModelNotAvailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::provider("OpenAI", "Test error");
        assert!(error.to_string().contains("OpenAI"));
        assert!(error.to_string().contains("Test error"));

        let config_error = Error::config("Invalid model name");
        assert!(config_error.to_string().contains("Invalid configuration"));
        assert!(config_error.is_configuration());
    }

    #[test]
    fn test_transport_error_displays_bare_message() {
        assert_eq!(Error::transport("rate limited").to_string(), "rate limited");
    }

    #[test]
    fn test_abort_classification() {
        assert!(Error::Aborted.is_abort());
        assert!(!Error::transport("boom").is_abort());
        assert!(!Error::Aborted.is_configuration());
    }
}
