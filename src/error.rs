//! Error types for the registration assistant.

use std::time::Duration;

/// Top-level error type.
///
/// Only configuration and session errors ever reach a caller of the core.
/// The capability variants (`Llm`, `Extraction`, `Confirmation`, `Generation`)
/// are recovered inside the dialogue controller; they are kept so code built
/// on the capabilities directly can use `?` into this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

impl LlmError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::RateLimited { .. })
    }
}

/// The structured-extraction capability failed or returned unusable output.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Extraction returned no JSON object: {raw}")]
    NoJson { raw: String },

    #[error("Extraction output did not match schema: {reason}")]
    Malformed { reason: String },
}

/// The confirmation-intent capability failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error("Confirmation classification failed: {0}")]
    Classification(#[from] ExtractionError),
}

/// The response-generation capability failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Generation returned empty content")]
    Empty,
}

/// Session-level errors surfaced to transports.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session key: {0:?}")]
    InvalidKey(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
