//! Dialogue controller — the per-turn registration state machine.
//!
//! Each turn takes a `ConversationState` snapshot and returns the next
//! snapshot plus the messages emitted on the way. Capability failures never
//! escape: extraction falls back to the prior fields, confirmation to "not
//! confirmed" and generation to a fixed apology.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::{FlowVariant, RegistrationConfig};
use crate::llm::LlmProvider;

use super::confirmation::ConfirmationAnalyzer;
use super::extractor::{FieldExtractor, Fields, find_email};
use super::prompts::{Instruction, closing_message};
use super::responder::ResponseGenerator;
use super::routing::{Route, route_after_email, route_after_name, route_registration};
use super::state::{ConversationState, DialoguePhase, StateUpdate, non_blank};

/// What the merged-flow controller decided for the pending utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to answer: the last entry is the assistant's own message.
    Skip,
    /// The user confirmed unchanged, complete data. The only accepting transition.
    Confirmed { name: String, email: String },
    /// Keep collecting; `fields` are stored and `instruction` drives the reply.
    Prompt {
        fields: Fields,
        instruction: Instruction,
    },
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: ConversationState,
    /// Messages emitted this turn, in order.
    pub responses: Vec<String>,
    pub finished: bool,
}

pub struct DialogueController {
    extractor: FieldExtractor,
    analyzer: ConfirmationAnalyzer,
    responder: ResponseGenerator,
    flow: FlowVariant,
}

impl DialogueController {
    pub fn new(
        extractor: FieldExtractor,
        analyzer: ConfirmationAnalyzer,
        responder: ResponseGenerator,
        flow: FlowVariant,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            responder,
            flow,
        }
    }

    /// Controller whose capabilities all share one provider.
    pub fn from_provider(llm: Arc<dyn LlmProvider>, config: &RegistrationConfig) -> Self {
        Self::new(
            FieldExtractor::new(Arc::clone(&llm)),
            ConfirmationAnalyzer::new(Arc::clone(&llm)),
            ResponseGenerator::new(llm, config),
            config.flow,
        )
    }

    /// Greet a fresh conversation before any user input.
    pub async fn start(&self, state: ConversationState) -> TurnOutcome {
        let mut state = state;
        let mut responses = Vec::new();
        if state.phase == DialoguePhase::Greeting && !state.finished {
            let update = timed("greet_user", self.greet()).await;
            responses.extend(state.apply(update));
        }
        outcome(state, responses)
    }

    /// Process one user utterance.
    pub async fn run_turn(&self, state: ConversationState, utterance: &str) -> TurnOutcome {
        let mut state = state;
        let mut responses = Vec::new();

        if state.finished || state.phase.is_terminal() {
            let update = self.finalize(&state);
            responses.extend(state.apply(update));
            return outcome(state, responses);
        }

        state.push_user(utterance);

        match state.phase {
            DialoguePhase::Greeting => {
                let update = timed("greet_user", self.greet()).await;
                responses.extend(state.apply(update));
            }
            DialoguePhase::ManageRegistration => {
                if route_registration(&state) == Route::ManageRegistration {
                    let update = timed("manage_registration", self.manage_registration(&state)).await;
                    responses.extend(state.apply(update));
                }
                if route_registration(&state) == Route::Finalize {
                    let update = self.finalize(&state);
                    responses.extend(state.apply(update));
                }
            }
            DialoguePhase::CollectName => {
                let update = timed("collect_name", self.collect_name(&state)).await;
                responses.extend(state.apply(update));
                if route_after_name(&state) == Route::CollectEmail {
                    state.apply(StateUpdate {
                        phase: Some(DialoguePhase::CollectEmail),
                        ..Default::default()
                    });
                }
            }
            DialoguePhase::CollectEmail => {
                let update = timed("collect_email", self.collect_email(&state)).await;
                responses.extend(state.apply(update));
                if route_after_email(&state) == Route::Finalize {
                    let update = self.finalize(&state);
                    responses.extend(state.apply(update));
                }
            }
            DialoguePhase::Finalized => {}
        }

        outcome(state, responses)
    }

    /// Opening message; moves into the first collection phase of the flow.
    pub async fn greet(&self) -> StateUpdate {
        let greeting = self.responder.greeting().await;
        let phase = match self.flow {
            FlowVariant::Merged => DialoguePhase::ManageRegistration,
            FlowVariant::Sequential => DialoguePhase::CollectName,
        };
        StateUpdate {
            phase: Some(phase),
            messages: vec![greeting],
            ..Default::default()
        }
    }

    /// Extraction, confirmation and next-step selection for the pending utterance.
    pub async fn decide(&self, state: &ConversationState) -> Decision {
        let Some(utterance) = state.pending_utterance() else {
            debug!("Last message is not from the user, skipping");
            return Decision::Skip;
        };

        let old_name = state.name.as_deref();
        let old_email = state.email.as_deref();

        let fields = self
            .extractor
            .extract_or_keep(old_name, old_email, utterance)
            .await;
        let result = self
            .analyzer
            .analyze(
                fields.name.as_deref(),
                old_name,
                fields.email.as_deref(),
                old_email,
                utterance,
            )
            .await;

        let name = non_blank(fields.name.as_deref()).map(str::to_string);
        let email = non_blank(fields.email.as_deref()).map(str::to_string);

        let instruction = match (name, email) {
            (Some(name), Some(email)) if result.is_confirmed => {
                info!("Registration data confirmed");
                return Decision::Confirmed { name, email };
            }
            (None, _) => Instruction::AskName,
            (Some(name), None) => Instruction::AskEmail { name },
            (Some(name), Some(email)) => Instruction::ConfirmData {
                name,
                email,
                updated: result.data_changed,
            },
        };
        debug!(?instruction, data_changed = result.data_changed, "Next instruction selected");

        Decision::Prompt {
            fields,
            instruction,
        }
    }

    /// Merged-flow node: decide, then render the decision into a state delta.
    ///
    /// A confirmation produces no message here; the finalize step speaks next.
    pub async fn manage_registration(&self, state: &ConversationState) -> StateUpdate {
        match self.decide(state).await {
            Decision::Skip => StateUpdate::default(),
            Decision::Confirmed { name, email } => StateUpdate {
                name: Some(name),
                email: Some(email),
                info_confirmed: Some(true),
                ..Default::default()
            },
            Decision::Prompt {
                fields,
                instruction,
            } => {
                let reply = self
                    .responder
                    .generate(&state.history, &instruction.render())
                    .await;
                StateUpdate {
                    name: fields.name,
                    email: fields.email,
                    info_confirmed: Some(false),
                    messages: vec![reply],
                    ..Default::default()
                }
            }
        }
    }

    /// Sequential-flow node: take the name from the pending utterance.
    pub async fn collect_name(&self, state: &ConversationState) -> StateUpdate {
        let Some(utterance) = state.pending_utterance() else {
            return StateUpdate::default();
        };

        match self.extractor.extract_name(utterance).await {
            Some(name) => {
                let instruction = Instruction::NameAccepted { name: name.clone() };
                let reply = self
                    .responder
                    .generate(&state.history, &instruction.render())
                    .await;
                StateUpdate {
                    name: Some(name),
                    messages: vec![reply],
                    ..Default::default()
                }
            }
            None => {
                let reply = self
                    .responder
                    .generate(&state.history, &Instruction::RequireRealName.render())
                    .await;
                StateUpdate {
                    messages: vec![reply],
                    ..Default::default()
                }
            }
        }
    }

    /// Sequential-flow node: take the first email-shaped text in the pending utterance.
    pub async fn collect_email(&self, state: &ConversationState) -> StateUpdate {
        let Some(utterance) = state.pending_utterance() else {
            return StateUpdate::default();
        };

        match find_email(utterance) {
            Some(email) => {
                let instruction = Instruction::EmailRecorded {
                    name: state.known_name().unwrap_or_default().to_string(),
                    email: email.to_string(),
                };
                let reply = self
                    .responder
                    .generate(&state.history, &instruction.render())
                    .await;
                StateUpdate {
                    email: Some(email.to_string()),
                    messages: vec![reply],
                    ..Default::default()
                }
            }
            None => {
                let reply = self
                    .responder
                    .generate(&state.history, &Instruction::RequireEmail.render())
                    .await;
                StateUpdate {
                    messages: vec![reply],
                    ..Default::default()
                }
            }
        }
    }

    /// Terminal step: closing message and `finished`. No-op once finished.
    pub fn finalize(&self, state: &ConversationState) -> StateUpdate {
        if state.finished {
            return StateUpdate::default();
        }
        let name = state.known_name().unwrap_or_default();
        let email = state.known_email().unwrap_or_default();
        info!(phase = %state.phase, "Finalizing registration");
        StateUpdate {
            finished: Some(true),
            phase: Some(DialoguePhase::Finalized),
            messages: vec![closing_message(name, email)],
            ..Default::default()
        }
    }
}

fn outcome(state: ConversationState, responses: Vec<String>) -> TurnOutcome {
    let finished = state.finished;
    TurnOutcome {
        state,
        responses,
        finished,
    }
}

/// Run a node, logging start, finish and elapsed time.
async fn timed<F>(node: &'static str, fut: F) -> StateUpdate
where
    F: Future<Output = StateUpdate>,
{
    info!(node, "START node");
    let started = Instant::now();
    let update = fut.await;
    info!(
        node,
        elapsed_ms = started.elapsed().as_millis() as u64,
        messages = update.messages.len(),
        "FINISHED node"
    );
    update
}
