//! Runs dialogue turns against stored sessions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::RegistrationConfig;
use crate::error::{Result, SessionError};
use crate::llm::LlmProvider;
use crate::registration::{ConversationState, DialogueController, TurnOutcome};

use super::store::SessionStore;

/// What a transport sends back after one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub responses: Vec<String>,
    pub finished: bool,
}

impl From<TurnOutcome> for TurnReply {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            responses: outcome.responses,
            finished: outcome.finished,
        }
    }
}

/// Serializes turns per session key; different sessions run concurrently.
pub struct RegistrationService {
    controller: DialogueController,
    store: Arc<dyn SessionStore>,
    /// Only keys with a turn in flight have an entry.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegistrationService {
    pub fn new(controller: DialogueController, store: Arc<dyn SessionStore>) -> Self {
        Self {
            controller,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service with every capability backed by `llm`.
    pub fn from_provider(
        llm: Arc<dyn LlmProvider>,
        config: &RegistrationConfig,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(DialogueController::from_provider(llm, config), store)
    }

    /// Process one user utterance for `session_key`.
    ///
    /// Blank utterances change nothing and get an empty reply.
    pub async fn process_turn(&self, session_key: &str, utterance: &str) -> Result<TurnReply> {
        let key = validate_key(session_key)?;
        let lock = self.session_lock(key).await;
        let reply = {
            let _guard = lock.lock().await;
            self.turn_locked(key, utterance).await
        };
        self.release_lock(key, lock).await;
        Ok(reply)
    }

    /// Greet a session before any user input. A no-op once greeted.
    pub async fn start_session(&self, session_key: &str) -> Result<TurnReply> {
        let key = validate_key(session_key)?;
        let lock = self.session_lock(key).await;
        let outcome = {
            let _guard = lock.lock().await;
            let state = self.store.get(key).await.unwrap_or_default();
            let outcome = self.controller.start(state).await;
            self.store.put(key, outcome.state.clone()).await;
            outcome
        };
        self.release_lock(key, lock).await;
        Ok(outcome.into())
    }

    async fn turn_locked(&self, key: &str, utterance: &str) -> TurnReply {
        let stored = self.store.get(key).await;
        let utterance = utterance.trim();
        if utterance.is_empty() {
            debug!(session = key, "Ignoring blank utterance");
            return TurnReply {
                responses: Vec::new(),
                finished: stored.is_some_and(|s| s.finished),
            };
        }

        let is_new = stored.is_none();
        let state = stored.unwrap_or_default();
        let outcome = self.controller.run_turn(state, utterance).await;
        info!(
            session = key,
            new_session = is_new,
            phase = %outcome.state.phase,
            turns = outcome.state.turns().len(),
            responses = outcome.responses.len(),
            finished = outcome.finished,
            "Turn processed"
        );

        self.store.put(key, outcome.state.clone()).await;
        outcome.into()
    }

    /// Current snapshot for `session_key`.
    pub async fn session(&self, session_key: &str) -> Option<ConversationState> {
        self.store.get(session_key.trim()).await
    }

    async fn session_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Drop the key's lock entry once no other turn holds or awaits it.
    async fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        let idle = locks
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(key);
        }
    }
}

fn validate_key(session_key: &str) -> std::result::Result<&str, SessionError> {
    let key = session_key.trim();
    if key.is_empty() {
        return Err(SessionError::InvalidKey(session_key.to_string()));
    }
    Ok(key)
}
