//! Turns a controller instruction into user-facing text.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::RegistrationConfig;
use crate::error::GenerationError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

use super::prompts::{GENERATION_FALLBACK, GREETING_FALLBACK, GREETING_PROMPT, STYLE_SUFFIX};
use super::state::{Message, Speaker};

/// Generates replies from history plus a trailing system instruction.
///
/// Never fails: any provider error becomes a fixed fallback text.
pub struct ResponseGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &RegistrationConfig) -> Self {
        Self {
            llm,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Reply to the conversation so far following `instruction`.
    pub async fn generate(&self, history: &[Message], instruction: &str) -> String {
        let mut messages: Vec<ChatMessage> = history.iter().map(to_chat).collect();
        messages.push(ChatMessage::system(format!("{instruction} {STYLE_SUFFIX}")));

        match self.try_complete(messages).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to generate instructed response");
                GENERATION_FALLBACK.to_string()
            }
        }
    }

    /// Opening message for a new conversation.
    pub async fn greeting(&self) -> String {
        match self.try_complete(vec![ChatMessage::user(GREETING_PROMPT)]).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to greet user");
                GREETING_FALLBACK.to_string()
            }
        }
    }

    async fn try_complete(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        let request = CompletionRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let started = Instant::now();
        let response = self.llm.complete(request).await?;
        let cost = response.cost(self.llm.cost_per_token());
        info!(
            model = self.llm.model_name(),
            response_id = response.response_id.as_deref().unwrap_or("-"),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %cost,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated reply"
        );
        if response.finish_reason != FinishReason::Stop {
            warn!(finish_reason = ?response.finish_reason, "Reply did not finish cleanly");
        }

        let text = response.content.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

fn to_chat(message: &Message) -> ChatMessage {
    match message.role {
        Speaker::User => ChatMessage::user(&message.content),
        Speaker::Assistant => ChatMessage::assistant(&message.content),
    }
}
