//! Registration dialogue — collects a user's name and email over free text.
//!
//! - `state`: the conversation snapshot and the deltas nodes return
//! - `extractor`, `confirmation`, `responder`: capability wrappers
//! - `controller`: the per-turn state machine
//! - `routing`: edges between nodes

pub mod confirmation;
pub mod controller;
pub mod extractor;
pub mod prompts;
pub mod responder;
pub mod routing;
pub mod state;

pub use confirmation::{ConfirmationAnalyzer, ConfirmationResult};
pub use controller::{Decision, DialogueController, TurnOutcome};
pub use extractor::{ExtractionOutcome, FieldExtractor, Fields};
pub use responder::ResponseGenerator;
pub use state::{ConversationState, DialoguePhase, Message, Speaker, StateUpdate};
