//! Conversation state keyed by thread/sender id.

pub mod service;
pub mod store;

pub use service::{RegistrationService, TurnReply};
pub use store::{InMemorySessionStore, SessionStore};
