//! Confirmation analyzer — decides whether the user accepted the summary.
//!
//! A turn that changed either field can never confirm, whatever the user
//! wrote. Otherwise a fixed token table answers most replies ("yes", "ok",
//! "sim", ...) and only the rest go to the classification capability.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfirmationError;
use crate::llm::LlmProvider;
use crate::llm::structured::complete_json;

use super::prompts::{CONFIRMATION_SYSTEM, confirmation_prompt};
use super::state::non_blank;

/// English affirmatives. "bye" counts: leaving after the summary accepts it.
///
/// Matching is per word with no sentence analysis, so a question that
/// contains a token ("is that right?", "sure?") confirms as well. Only a
/// negation word keeps a reply off the fast path.
const AFFIRMATIVE_EN: &[&str] = &[
    "yes", "yep", "yeah", "yea", "ok", "okay", "correct", "right", "confirm", "confirmed", "sure",
    "bye",
];

/// Portuguese affirmatives. "ta" is the unaccented "tá"; "isso" ("that's it")
/// also appears inside questions such as "isso mesmo?", which confirm too.
const AFFIRMATIVE_PT: &[&str] = &["sim", "tá", "ta", "certo", "isso"];

/// Spanish affirmatives.
const AFFIRMATIVE_ES: &[&str] = &["si", "sí", "claro"];

/// Any of these sends the reply to the classifier instead of the fast path
/// ("no, that's not right").
const NEGATIONS: &[&str] = &["no", "not", "nope", "wrong", "incorrect", "não", "nao"];

/// Outcome of analyzing one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationResult {
    pub is_confirmed: bool,
    pub data_changed: bool,
}

#[derive(Debug, Deserialize)]
struct ConfirmationCheck {
    #[serde(default)]
    is_confirmed: bool,
}

pub struct ConfirmationAnalyzer {
    llm: Arc<dyn LlmProvider>,
}

impl ConfirmationAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn analyze(
        &self,
        new_name: Option<&str>,
        old_name: Option<&str>,
        new_email: Option<&str>,
        old_email: Option<&str>,
        utterance: &str,
    ) -> ConfirmationResult {
        let data_changed = new_name != old_name || new_email != old_email;
        if data_changed {
            info!("Data changed in this turn, forcing summary review");
            return ConfirmationResult {
                is_confirmed: false,
                data_changed,
            };
        }

        if non_blank(new_name).is_none() || non_blank(new_email).is_none() {
            return ConfirmationResult::default();
        }

        if let Some(token) = affirmative_token(utterance) {
            info!(token, "Fast-path confirmation detected");
            return ConfirmationResult {
                is_confirmed: true,
                data_changed,
            };
        }

        let is_confirmed = match self.classify(utterance).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(error = %e, "Confirmation check failed, treating as not confirmed");
                false
            }
        };
        ConfirmationResult {
            is_confirmed,
            data_changed,
        }
    }

    async fn classify(&self, utterance: &str) -> Result<bool, ConfirmationError> {
        let prompt = confirmation_prompt(utterance);
        let check: ConfirmationCheck =
            complete_json(self.llm.as_ref(), CONFIRMATION_SYSTEM, &prompt).await?;
        debug!(is_confirmed = check.is_confirmed, "Confirmation classifier returned");
        Ok(check.is_confirmed)
    }
}

/// The affirmative token that confirms `utterance` on the fast path, if any.
///
/// Whole words only, case-insensitive. Utterances containing a negation never
/// take the fast path.
pub fn affirmative_token(utterance: &str) -> Option<&'static str> {
    let lowered = utterance.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| NEGATIONS.contains(w)) {
        return None;
    }

    words.iter().find_map(|w| {
        AFFIRMATIVE_EN
            .iter()
            .chain(AFFIRMATIVE_PT)
            .chain(AFFIRMATIVE_ES)
            .find(|token| **token == *w)
            .copied()
    })
}
