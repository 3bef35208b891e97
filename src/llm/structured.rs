//! Structured extraction on top of plain chat completion.
//!
//! The model is asked for a single JSON object (provider JSON mode when
//! available) and the reply is deserialized into a caller-supplied type. Any
//! transport failure or unusable output becomes an [`ExtractionError`].

use serde::de::DeserializeOwned;
use tracing::debug;

use super::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::error::ExtractionError;

const EXTRACTION_MAX_TOKENS: u32 = 512;

/// Run a JSON-mode completion and deserialize the result into `T`.
pub async fn complete_json<T: DeserializeOwned>(
    llm: &dyn LlmProvider,
    system: &str,
    prompt: &str,
) -> Result<T, ExtractionError> {
    let request = CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
        .with_temperature(0.0)
        .with_max_tokens(EXTRACTION_MAX_TOKENS)
        .with_json_mode();

    let response = llm.complete(request).await?;
    debug!(
        model = llm.model_name(),
        output_tokens = response.output_tokens,
        "Structured completion returned"
    );
    parse_json_object(&response.content)
}

/// Deserialize the first JSON object found in `text`.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    let json = extract_json_object(text).ok_or_else(|| ExtractionError::NoJson {
        raw: text.chars().take(200).collect(),
    })?;
    serde_json::from_str(json).map_err(|e| ExtractionError::Malformed {
        reason: e.to_string(),
    })
}

/// Locate a JSON object in LLM output that might carry markdown fences or prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        let end = trimmed.rfind('}')?;
        return Some(&trimmed[..=end]);
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return Some(&trimmed[start..=end]);
    }

    None
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::llm::mock::ScriptedLlm;

    #[derive(Debug, Deserialize)]
    struct NameOnly {
        name: Option<String>,
    }

    #[test]
    fn extract_json_direct_object() {
        let input = r#"{"name": "Maria"}"#;
        assert_eq!(extract_json_object(input), Some(input));
    }

    #[test]
    fn extract_json_from_markdown_block() {
        let input = "```json\n{\"name\": null}\n```";
        assert_eq!(extract_json_object(input), Some("{\"name\": null}"));
    }

    #[test]
    fn extract_json_embedded_in_text() {
        let input = "Sure: {\"name\": \"Ana\"} hope that helps";
        assert_eq!(extract_json_object(input), Some("{\"name\": \"Ana\"}"));
    }

    #[test]
    fn extract_json_object_followed_by_prose() {
        let input = "{\"name\": \"Maria\"}\nLet me know if you need anything else.";
        assert_eq!(extract_json_object(input), Some("{\"name\": \"Maria\"}"));

        let parsed = parse_json_object::<NameOnly>(input).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Maria"));
    }

    #[test]
    fn unterminated_object_is_an_error() {
        let err = parse_json_object::<NameOnly>("{\"name\": \"Maria\"").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJson { .. }));
    }

    #[test]
    fn no_object_is_an_error() {
        let err = parse_json_object::<NameOnly>("I cannot help with that").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJson { .. }));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = parse_json_object::<NameOnly>(r#"{"name": 42}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn complete_json_requests_json_mode() {
        let llm = ScriptedLlm::new([r#"{"name": "Maria"}"#]);
        let parsed: NameOnly = complete_json(&llm, "system", "prompt").await.unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Maria"));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn complete_json_maps_provider_failure() {
        let llm = ScriptedLlm::failing();
        let err = complete_json::<NameOnly>(&llm, "system", "prompt").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Llm(_)));
    }
}
