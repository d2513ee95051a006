use serde::{Deserialize, Serialize};
use crate::message::Message;

/// Events emitted by the session manager.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelEvent {
    /// Session list or titles changed
    SessionsChanged,

    /// The active pointer moved (None once every session is gone)
    ActiveSessionChanged { session_id: Option<String> },

    /// A message was persisted to a session's transcript
    MessageAppended { session_id: String, message: Message },

    /// A turn was handed to the relay
    RelayStarted { session_id: String },

    /// The relay produced its one outcome
    RelayFinished { session_id: String, ok: bool },

    /// Draft text changed outside the composer (e.g. dictation)
    DraftChanged { text: String },

    /// A non-transcript failure (storage, channel)
    Error { message: String },
}

/// Output of the speech-to-text capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpeechEvent {
    Started,
    /// Recognized text; only final fragments reach the draft
    Fragment { text: String, is_final: bool },
    Ended,
    Error { message: String },
}
