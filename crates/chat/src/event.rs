//! Events emitted while a turn is answered incrementally.
//!
//! The gateway forwards them to clients as SSE events:
//! - `warning`   an attached file was skipped or could not be read
//! - `chunk`     a response fragment
//! - `fallback`  the runtime failed; the fallback message replaces the reply
//! - `done`      the turn is complete and recorded in the log

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Warning { file: String, message: String },

    Chunk { content: String },

    Fallback { message: String, error: String },

    /// `response` is exactly what was appended to the conversation log.
    Done { response: String, fallback: bool },
}

impl TurnEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Warning { .. } => "warning",
            Self::Chunk { .. } => "chunk",
            Self::Fallback { .. } => "fallback",
            Self::Done { .. } => "done",
        }
    }
}
