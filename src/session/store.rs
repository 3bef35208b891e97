//! Session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::registration::ConversationState;

/// Keyed storage for conversation snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored state for `key`, if any.
    async fn get(&self, key: &str) -> Option<ConversationState>;

    /// Replace the state for `key`.
    async fn put(&self, key: &str, state: ConversationState);
}

/// Process-local store. Last write wins.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Option<ConversationState> {
        self.sessions.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, state: ConversationState) {
        self.sessions.write().await.insert(key.to_string(), state);
    }
}
