use serde::{Deserialize, Serialize};

/// Prefix that marks an assistant message as a relay failure.
pub const ERROR_MARKER: &str = "⚠️";

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single persisted message in a session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Creation instant, unix milliseconds
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

/// The `{role, content}` pair sent over the wire. Local-only fields stay behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// An assistant message reporting a failed relay call.
    pub fn relay_error(reason: impl std::fmt::Display) -> Self {
        Self::assistant(format!("{} {}", ERROR_MARKER, reason))
    }

    pub fn is_error(&self) -> bool {
        self.role == Role::Assistant && self.content.starts_with(ERROR_MARKER)
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Strip a transcript down to what the remote endpoint sees, oldest first.
pub fn to_wire_transcript(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(Message::to_wire).collect()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_message_id() -> String {
    format!("m_{}", uuid::Uuid::new_v4().simple())
}
