use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::message::Message;

/// Title shown until the first user message names the session
pub const DEFAULT_TITLE: &str = "New chat";

/// Session titles are cut to this many characters
pub const TITLE_MAX_CHARS: usize = 40;

/// Greeting seeded into the bootstrap session on a fresh install
pub const WELCOME_GREETING: &str = "Hi! I'm SMARTSAT. How can I help you today?";

/// One conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SessionRecord")]
pub struct Session {
    pub id: String,
    pub title: String,
    /// Cleared by the first user turn; the title is never re-derived afterwards
    pub title_is_default: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: format!("s_{}", uuid::Uuid::new_v4().simple()),
            title: DEFAULT_TITLE.to_string(),
            title_is_default: true,
        }
    }

    /// Name the session after its first user message. Returns false if the
    /// title was already derived.
    pub fn derive_title(&mut self, first_user_text: &str) -> bool {
        if !self.title_is_default {
            return false;
        }
        self.title = truncate_title(first_user_text);
        self.title_is_default = false;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub fn truncate_title(text: &str) -> String {
    text.trim().chars().take(TITLE_MAX_CHARS).collect()
}

/// On-disk shape. Records written before the title flag existed infer it
/// from the placeholder text.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: String,
    #[serde(default)]
    title: String,
    title_is_default: Option<bool>,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        let untitled = record.title.trim().is_empty();
        let title_is_default = record
            .title_is_default
            .unwrap_or(untitled || record.title == DEFAULT_TITLE);
        Self {
            id: record.id,
            title: if untitled { DEFAULT_TITLE.to_string() } else { record.title },
            title_is_default,
        }
    }
}

/// Everything persisted for the panel: the session list, each session's
/// transcript, and the active pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAggregate {
    pub sessions: Vec<Session>,
    pub messages_by_session: BTreeMap<String, Vec<Message>>,
    pub active_session_id: Option<String>,
}

impl SessionAggregate {
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == session_id)
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == session_id)
    }

    pub fn messages(&self, session_id: &str) -> &[Message] {
        self.messages_by_session
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    /// The active pointer is null exactly when there are no sessions, and
    /// otherwise names one of them.
    pub fn active_pointer_is_valid(&self) -> bool {
        match &self.active_session_id {
            None => self.sessions.is_empty(),
            Some(id) => self.contains(id),
        }
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                title: s.title.clone(),
                message_count: self.messages(&s.id).len(),
            })
            .collect()
    }
}

/// Summary of a session for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
}
