//! UI-level state that drives rendering.
//! This is a read-only projection of the session manager, refreshed each
//! frame by draining the EventBus and, when sessions or transcripts moved,
//! re-capturing a [`PanelView`].

use panel_core::manager::SessionManager;
use panel_types::config::RelayConfig;
use panel_types::event::PanelEvent;
use panel_types::message::{Message, Role};
use panel_types::session::SessionSummary;

/// State visible to UI panels
pub struct UiState {
    /// Sidebar entries, in display order
    pub sessions: Vec<SessionSummary>,
    pub active_session_id: Option<String>,
    /// Transcript of the active session
    pub messages: Vec<ChatEntry>,
    /// Composer content
    pub input_text: String,
    /// Relay call in flight for the active session
    pub sending: bool,
    pub dictating: bool,
    pub speech_supported: bool,
    /// Whether the settings panel is open
    pub show_settings: bool,
    /// Status line text
    pub status_text: String,
    /// Set when the manager must be re-read before the next frame
    pub needs_sync: bool,
}

/// A chat entry for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub is_error: bool,
}

impl From<&Message> for ChatEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            is_error: message.is_error(),
        }
    }
}

/// What the panels need from the manager, captured in one go
#[derive(Debug, Clone, Default)]
pub struct PanelView {
    pub sessions: Vec<SessionSummary>,
    pub active_session_id: Option<String>,
    pub messages: Vec<Message>,
    pub sending: bool,
}

impl PanelView {
    pub fn capture(manager: &SessionManager) -> Self {
        Self {
            sessions: manager.sessions(),
            active_session_id: manager.active_session_id(),
            messages: manager.active_messages(),
            sending: manager.is_sending(),
        }
    }
}

/// Editable copy of the relay settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub endpoint_url: String,
    pub api_key: String,
    pub model: String,
}

impl SettingsForm {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            endpoint_url: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone().unwrap_or_default(),
        }
    }

    /// Trimmed config; a blank model means "use the default"
    pub fn to_config(&self) -> RelayConfig {
        RelayConfig {
            endpoint_url: self.endpoint_url.clone(),
            api_key: self.api_key.clone(),
            model: Some(self.model.clone()),
        }
        .normalized()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            active_session_id: None,
            messages: Vec::new(),
            input_text: String::new(),
            sending: false,
            dictating: false,
            speech_supported: false,
            show_settings: false,
            status_text: "Ready".to_string(),
            needs_sync: true,
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<PanelEvent>) {
        for event in events {
            match event {
                PanelEvent::SessionsChanged
                | PanelEvent::ActiveSessionChanged { .. }
                | PanelEvent::MessageAppended { .. } => {
                    self.needs_sync = true;
                }
                PanelEvent::RelayStarted { .. } => {
                    self.status_text = "Sending...".to_string();
                    self.needs_sync = true;
                }
                PanelEvent::RelayFinished { ok, .. } => {
                    self.status_text = if ok { "Ready" } else { "Last request failed" }.to_string();
                    self.needs_sync = true;
                }
                PanelEvent::DraftChanged { text } => {
                    self.input_text = text;
                }
                PanelEvent::Error { message } => {
                    self.status_text = format!("Error: {}", message);
                }
            }
        }
    }

    /// Replace the projection with a fresh view of the manager
    pub fn apply_view(&mut self, view: PanelView) {
        self.sessions = view.sessions;
        self.active_session_id = view.active_session_id;
        self.messages = view.messages.iter().map(ChatEntry::from).collect();
        self.sending = view.sending;
        self.needs_sync = false;
    }

    pub fn is_busy(&self) -> bool {
        self.sending
    }

    pub fn can_submit(&self) -> bool {
        !self.sending && !self.input_text.trim().is_empty()
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active_session_id.as_deref() == Some(session_id)
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
