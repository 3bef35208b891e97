//! LLM integration.
//!
//! A single `LlmProvider` trait backs every capability the dialogue needs:
//! reply generation calls `complete` directly, while field extraction and
//! confirmation classification go through [`structured::complete_json`].
//! The only shipped backend speaks the OpenAI chat completions wire format,
//! which covers Groq, OpenAI and most self-hosted servers.

#[cfg(test)]
pub(crate) mod mock;
pub mod openai_compat;
pub mod provider;
pub(crate) mod retry;
pub mod structured;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAiCompatible,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub base_url: String,
    pub model: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::OpenAiCompatible => {
            let provider = OpenAiCompatProvider::new(
                config.api_key.clone(),
                &config.base_url,
                &config.model,
                config.max_retries,
                config.timeout,
            )?;
            tracing::info!(
                model = %config.model,
                base_url = %config.base_url,
                "Using OpenAI-compatible provider"
            );
            Ok(Arc::new(provider))
        }
    }
}
