//! Pulls name/email updates out of free text.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::llm::LlmProvider;
use crate::llm::structured::complete_json;

use super::prompts::{EXTRACTION_SYSTEM, extraction_prompt, name_extraction_prompt};
use super::state::non_blank;

static EMAIL_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});

static EMAIL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});

/// Words the model sometimes returns as a "name" that are not names.
const PLACEHOLDER_NAMES: &[&str] = &[
    "user", "none", "unknown", "customer", "guest", "null", "n/a", "you", "i", "me", "he",
    "she", "bro", "man",
];

/// Candidate name/email after a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Fields {
    pub fn new(name: Option<&str>, email: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    /// Both fields present and non-blank.
    pub fn is_complete(&self) -> bool {
        non_blank(self.name.as_deref()).is_some() && non_blank(self.email.as_deref()).is_some()
    }
}

/// Result of one extraction attempt.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// The capability answered; fields already merged with the prior values.
    Updated(Fields),
    /// The capability failed; the caller must fall back to the prior values.
    Failed(ExtractionError),
}

impl ExtractionOutcome {
    /// Updated fields, or `current` unchanged on failure.
    pub fn or_keep(self, current: Fields) -> Fields {
        match self {
            Self::Updated(fields) => fields,
            Self::Failed(e) => {
                warn!(error = %e, "Data extraction failed, keeping previous values");
                current
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataUpdate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NameExtraction {
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    name: Option<String>,
}

/// Extracts field updates through the structured-extraction capability.
pub struct FieldExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl FieldExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Ask the capability for updates and merge them over the current values.
    ///
    /// Names are accepted only when non-blank and not a placeholder; emails
    /// only when email-shaped. Rejected values leave the field unchanged.
    pub async fn extract(
        &self,
        current_name: Option<&str>,
        current_email: Option<&str>,
        utterance: &str,
    ) -> ExtractionOutcome {
        let prompt = extraction_prompt(current_name, current_email, utterance);
        let update: DataUpdate = match complete_json(self.llm.as_ref(), EXTRACTION_SYSTEM, &prompt).await {
            Ok(update) => update,
            Err(e) => return ExtractionOutcome::Failed(e),
        };
        debug!(extracted_name = ?update.name, extracted_email = ?update.email, "Extraction returned");

        let name = match update.name.as_deref().and_then(accept_name) {
            Some(name) => Some(name.to_string()),
            None => current_name.map(str::to_string),
        };

        let email = match update.email.as_deref().map(str::trim) {
            Some(candidate) if is_valid_email(candidate) => Some(candidate.to_string()),
            Some(rejected) => {
                if !rejected.is_empty() {
                    debug!(email = rejected, "Ignoring invalid email from extraction");
                }
                current_email.map(str::to_string)
            }
            None => current_email.map(str::to_string),
        };

        ExtractionOutcome::Updated(Fields { name, email })
    }

    /// `extract`, with the failure path already folded into the prior values.
    pub async fn extract_or_keep(
        &self,
        current_name: Option<&str>,
        current_email: Option<&str>,
        utterance: &str,
    ) -> Fields {
        self.extract(current_name, current_email, utterance)
            .await
            .or_keep(Fields::new(current_name, current_email))
    }

    /// Name-only extraction used by the sequential flow. `None` means no
    /// usable name, including capability failure.
    pub async fn extract_name(&self, utterance: &str) -> Option<String> {
        let prompt = name_extraction_prompt(utterance);
        match complete_json::<NameExtraction>(self.llm.as_ref(), EXTRACTION_SYSTEM, &prompt).await {
            Ok(result) => {
                debug!(reasoning = %result.reasoning, extracted_name = ?result.name, "Name extraction returned");
                result.name.as_deref().and_then(accept_name).map(str::to_string)
            }
            Err(e) => {
                warn!(error = %e, "Name extraction failed, using fallback");
                None
            }
        }
    }
}

/// Whether `candidate` is an email address: local part, `@`, domain, `.`, TLD
/// of two or more letters.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_EXACT.is_match(candidate.trim())
}

/// First email-shaped substring of `text`.
pub fn find_email(text: &str) -> Option<&str> {
    EMAIL_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Trimmed name unless blank or a known placeholder.
fn accept_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    let lowered = name.to_lowercase();
    if PLACEHOLDER_NAMES.contains(&lowered.as_str()) {
        debug!(candidate = name, "Rejecting placeholder name");
        return None;
    }
    Some(name)
}
