//! Conversation log domain types.
//!
//! The log is what the user sees: an ordered list of turns that starts with
//! a single assistant greeting. It only grows, except for an explicit
//! [`ConversationLog::reset`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting seeded into every fresh or reset log.
pub const DEFAULT_GREETING: &str = "What can I help you with today?";

/// The speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered chat history of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    greeting: String,
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create a log seeded with the given greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone())],
            greeting,
        }
    }

    /// Add one turn to the end. No deduplication, no size cap.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the whole log with the single greeting turn.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(self.greeting.clone()));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}
