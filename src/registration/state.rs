//! Conversation state, the single value threaded through every turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The phases of a registration conversation.
///
/// Merged flow: Greeting → ManageRegistration → Finalized.
/// Sequential flow: Greeting → CollectName → CollectEmail → Finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    #[default]
    Greeting,
    CollectName,
    CollectEmail,
    ManageRegistration,
    Finalized,
}

impl DialoguePhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: DialoguePhase) -> bool {
        use DialoguePhase::*;
        matches!(
            (self, target),
            (Greeting, CollectName)
                | (Greeting, ManageRegistration)
                | (CollectName, CollectEmail)
                | (CollectEmail, Finalized)
                | (ManageRegistration, Finalized)
        )
    }

    /// Whether the conversation is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl std::fmt::Display for DialoguePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::CollectName => "collect_name",
            Self::CollectEmail => "collect_email",
            Self::ManageRegistration => "manage_registration",
            Self::Finalized => "finalized",
        };
        write!(f, "{s}")
    }
}

/// Who authored a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One history entry. Appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Speaker,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// A user utterance plus the assistant messages that answered it.
///
/// The opening greeting forms a turn with no user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn<'a> {
    pub user: Option<&'a Message>,
    pub replies: Vec<&'a Message>,
}

/// Delta produced by a dialogue node. `None` fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub info_confirmed: Option<bool>,
    pub finished: Option<bool>,
    pub phase: Option<DialoguePhase>,
    pub messages: Vec<String>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything known about one registration conversation.
///
/// Serializable so any external store can persist it between turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub name: Option<String>,
    pub email: Option<String>,
    pub info_confirmed: bool,
    pub finished: bool,
    pub phase: DialoguePhase,
    pub history: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The name, if present and not blank.
    pub fn known_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// The email, if present and not blank.
    pub fn known_email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    /// The most recent history entry.
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// The latest user utterance, only if nothing has answered it yet.
    pub fn pending_utterance(&self) -> Option<&str> {
        match self.history.last() {
            Some(m) if m.role == Speaker::User => Some(m.content.as_str()),
            _ => None,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(Message::user(content));
    }

    /// Group history into turns.
    pub fn turns(&self) -> Vec<Turn<'_>> {
        let mut turns: Vec<Turn<'_>> = Vec::new();
        for message in &self.history {
            match message.role {
                Speaker::User => turns.push(Turn {
                    user: Some(message),
                    replies: Vec::new(),
                }),
                Speaker::Assistant => match turns.last_mut() {
                    Some(turn) => turn.replies.push(message),
                    None => turns.push(Turn {
                        user: None,
                        replies: vec![message],
                    }),
                },
            }
        }
        turns
    }

    /// Merge a node's update into the state. Returns the messages it added.
    ///
    /// A finished conversation is frozen: updates are dropped. Confirmation is
    /// only recorded while both fields are non-blank.
    pub fn apply(&mut self, update: StateUpdate) -> Vec<String> {
        if self.finished {
            if !update.is_empty() {
                tracing::debug!("Ignoring update for finished conversation");
            }
            return Vec::new();
        }

        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(confirmed) = update.info_confirmed {
            if confirmed && (self.known_name().is_none() || self.known_email().is_none()) {
                tracing::warn!("Refusing to confirm registration with missing fields");
                self.info_confirmed = false;
            } else {
                self.info_confirmed = confirmed;
            }
        }
        if let Some(phase) = update.phase
            && phase != self.phase
        {
            if self.phase.can_transition_to(phase) {
                self.phase = phase;
            } else {
                tracing::warn!(from = %self.phase, to = %phase, "Invalid phase transition ignored");
            }
        }
        if let Some(finished) = update.finished {
            self.finished = finished;
        }

        for content in &update.messages {
            self.history.push(Message::assistant(content.clone()));
        }
        update.messages
    }
}

/// Trimmed value, or `None` when absent or whitespace-only.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use DialoguePhase::*;
        let transitions = [
            (Greeting, CollectName),
            (Greeting, ManageRegistration),
            (CollectName, CollectEmail),
            (CollectEmail, Finalized),
            (ManageRegistration, Finalized),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use DialoguePhase::*;
        assert!(!Greeting.can_transition_to(Finalized));
        assert!(!Finalized.can_transition_to(Greeting));
        assert!(!CollectEmail.can_transition_to(CollectName));
        assert!(!ManageRegistration.can_transition_to(CollectName));
    }

    #[test]
    fn display_matches_serde() {
        use DialoguePhase::*;
        for phase in [Greeting, CollectName, CollectEmail, ManageRegistration, Finalized] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{phase}\""), json);
        }
    }

    #[test]
    fn non_blank_treats_whitespace_as_missing() {
        assert_eq!(non_blank(Some("  Maria ")), Some("Maria"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn pending_utterance_only_when_user_spoke_last() {
        let mut state = ConversationState::new();
        assert!(state.pending_utterance().is_none());

        state.push_user("hi");
        assert_eq!(state.pending_utterance(), Some("hi"));

        state.apply(StateUpdate {
            messages: vec!["Hello! What's your name?".into()],
            ..Default::default()
        });
        assert!(state.pending_utterance().is_none());
    }

    #[test]
    fn apply_refuses_confirmation_with_missing_email() {
        let mut state = ConversationState::new();
        state.apply(StateUpdate {
            name: Some("Maria".into()),
            info_confirmed: Some(true),
            ..Default::default()
        });
        assert!(!state.info_confirmed);
        assert_eq!(state.known_name(), Some("Maria"));
    }

    #[test]
    fn apply_ignores_invalid_phase_jump() {
        let mut state = ConversationState::new();
        state.apply(StateUpdate {
            phase: Some(DialoguePhase::Finalized),
            ..Default::default()
        });
        assert_eq!(state.phase, DialoguePhase::Greeting);
    }

    #[test]
    fn finished_state_is_frozen() {
        let mut state = ConversationState {
            name: Some("Maria".into()),
            email: Some("maria@example.com".into()),
            info_confirmed: true,
            finished: true,
            phase: DialoguePhase::Finalized,
            history: Vec::new(),
        };
        let added = state.apply(StateUpdate {
            name: Some("Other".into()),
            messages: vec!["late".into()],
            ..Default::default()
        });
        assert!(added.is_empty());
        assert_eq!(state.name.as_deref(), Some("Maria"));
        assert!(state.history.is_empty());
    }

    #[test]
    fn turns_group_replies_under_user_messages() {
        let mut state = ConversationState::new();
        state.apply(StateUpdate {
            messages: vec!["Hello".into()],
            ..Default::default()
        });
        state.push_user("I am Maria");
        state.apply(StateUpdate {
            messages: vec!["Thanks Maria, your email?".into()],
            ..Default::default()
        });
        state.push_user("maria@example.com");

        let turns = state.turns();
        assert_eq!(turns.len(), 3);
        assert!(turns[0].user.is_none());
        assert_eq!(turns[0].replies.len(), 1);
        assert_eq!(turns[1].user.unwrap().content, "I am Maria");
        assert_eq!(turns[1].replies.len(), 1);
        assert!(turns[2].replies.is_empty());
    }

    #[test]
    fn state_serde_roundtrip() {
        let mut state = ConversationState::new();
        state.push_user("I am Maria");
        state.apply(StateUpdate {
            name: Some("Maria".into()),
            phase: Some(DialoguePhase::ManageRegistration),
            messages: vec!["What's your email?".into()],
            ..Default::default()
        });

        let json = serde_json::to_string(&state).unwrap();
        let parsed: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
        assert_eq!(parsed.phase, DialoguePhase::ManageRegistration);
    }
}
