//! Configuration types.
//!
//! Everything is read from the environment, the same way the binary reads
//! its API key and port.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Groq's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Which dialogue graph drives a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowVariant {
    /// Single extraction-and-confirmation loop (name and email together).
    #[default]
    Merged,
    /// Ask for the name, then the email, then finish without a confirmation step.
    Sequential,
}

impl std::str::FromStr for FlowVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merged" => Ok(Self::Merged),
            "sequential" => Ok(Self::Sequential),
            other => Err(ConfigError::InvalidValue {
                key: "REGISTRATION_FLOW".to_string(),
                message: format!("expected 'merged' or 'sequential', got '{other}'"),
            }),
        }
    }
}

/// Dialogue-level settings shared by every session.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub flow: FlowVariant,
    /// Temperature used for reply generation. Extraction always runs at 0.0.
    pub temperature: f32,
    /// Max tokens for generated replies.
    pub max_tokens: u32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            flow: FlowVariant::default(),
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

/// Application configuration for the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub registration: RegistrationConfig,
    /// HTTP port for the webhook server.
    pub port: u16,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature: f32 = parse_env("LLM_TEMPERATURE", 0.0)?;
        let max_retries: u32 = parse_env("LLM_MAX_RETRIES", 3)?;
        let timeout_secs: u64 = parse_env("LLM_TIMEOUT_SECS", 30)?;
        let port: u16 = parse_env("REGISTRATION_PORT", 8000)?;

        let flow = match std::env::var("REGISTRATION_FLOW") {
            Ok(v) => v.parse()?,
            Err(_) => FlowVariant::default(),
        };

        Ok(Self {
            llm: LlmConfig {
                backend: LlmBackend::OpenAiCompatible,
                api_key: SecretString::from(api_key),
                base_url,
                model,
                max_retries,
                timeout: Duration::from_secs(timeout_secs),
            },
            registration: RegistrationConfig {
                flow,
                temperature,
                ..RegistrationConfig::default()
            },
            port,
            log_dir: std::env::var("REGISTRATION_LOG_DIR").ok(),
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_variant_parses_case_insensitively() {
        assert_eq!("Merged".parse::<FlowVariant>().unwrap(), FlowVariant::Merged);
        assert_eq!(
            " sequential ".parse::<FlowVariant>().unwrap(),
            FlowVariant::Sequential
        );
        assert!("linear".parse::<FlowVariant>().is_err());
    }

    #[test]
    fn parse_env_uses_default_when_unset() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::remove_var("REGISTRATION_TEST_UNSET_PORT") };
        let port: u16 = parse_env("REGISTRATION_TEST_UNSET_PORT", 8000).unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn parse_env_rejects_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("REGISTRATION_TEST_BAD_PORT", "eighty") };
        let err = parse_env::<u16>("REGISTRATION_TEST_BAD_PORT", 8000).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "REGISTRATION_TEST_BAD_PORT"));
    }

    #[test]
    fn default_registration_config() {
        let config = RegistrationConfig::default();
        assert_eq!(config.flow, FlowVariant::Merged);
        assert_eq!(config.temperature, 0.0);
    }
}
