//! Session manager — session lifecycle, turn taking, and the invariants
//! around the persisted aggregate.
//!
//! Every mutation runs as a closure over a freshly loaded snapshot and is
//! saved against the revision it read. If another context saved in between,
//! the closure is re-applied to the newer snapshot. Nothing holds a borrow
//! across an await, so the manager can be shared via `Rc` and driven from
//! `spawn_local` tasks.
//!
//! Invariant: the active pointer is `None` exactly when there are no
//! sessions, and otherwise names an existing session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use panel_types::{
    PanelError, Result,
    event::{PanelEvent, SpeechEvent},
    message::{to_wire_transcript, Message},
    protocol::QueryPayload,
    session::{Session, SessionAggregate, SessionSummary, WELCOME_GREETING},
};
use crate::draft::DraftBuffer;
use crate::event_bus::EventBus;
use crate::ports::RelayPort;
use crate::store::{SessionPatch, SessionStore};

/// Attempts per mutation before a conflict is reported
const MAX_SAVE_ATTEMPTS: usize = 3;

/// Stored in place of an empty reply so persisted content is never blank
const EMPTY_REPLY: &str = "(empty response)";

/// What became of one submitted turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub session_id: String,
    /// Whether the relay succeeded
    pub ok: bool,
    /// False if the session was deleted before the reply arrived
    pub reply_appended: bool,
}

pub struct SessionManager {
    store: SessionStore,
    relay: Rc<dyn RelayPort>,
    event_bus: EventBus,
    /// Last aggregate this context read or wrote, for rendering
    view: RefCell<SessionAggregate>,
    draft: RefCell<DraftBuffer>,
    /// Relay calls waiting per session
    in_flight: RefCell<HashMap<String, usize>>,
}

impl SessionManager {
    pub fn new(store: SessionStore, relay: Rc<dyn RelayPort>, event_bus: EventBus) -> Self {
        Self {
            store,
            relay,
            event_bus,
            view: RefCell::new(SessionAggregate::default()),
            draft: RefCell::new(DraftBuffer::new()),
            in_flight: RefCell::new(HashMap::new()),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Bring the persisted state up: seed the welcome session on a fresh
    /// install, otherwise repair the active pointer if it dangles.
    ///
    /// If storage cannot be read or written, the panel still starts from a
    /// seeded in-memory state and the error is returned for logging.
    pub async fn load(&self) -> Result<()> {
        match self.mutate(bootstrap).await {
            Ok(seeded) => {
                if seeded {
                    log::info!("Seeded welcome session on {}", self.store.backend_name());
                }
                self.event_bus.emit(PanelEvent::SessionsChanged);
                self.emit_active();
                Ok(())
            }
            Err(e) => {
                log::error!("Session storage unavailable ({}), starting from defaults", e);
                // Show whatever is still readable; seed if nothing is
                let mut fallback = self.store.load_or_default().await.aggregate;
                bootstrap(&mut fallback);
                *self.view.borrow_mut() = fallback;
                self.event_bus.emit(PanelEvent::Error {
                    message: format!("Chats could not be loaded: {}", e),
                });
                self.event_bus.emit(PanelEvent::SessionsChanged);
                self.emit_active();
                Err(e)
            }
        }
    }

    /// Re-read the store, picking up writes from other contexts.
    pub async fn refresh(&self) -> Result<()> {
        let snapshot = self.store.load().await?;
        *self.view.borrow_mut() = snapshot.aggregate;
        self.event_bus.emit(PanelEvent::SessionsChanged);
        Ok(())
    }

    /// Start an empty chat (no greeting) and make it active.
    pub async fn create_session(&self) -> Result<String> {
        let session_id = self
            .mutate(|agg| {
                let session = Session::new();
                let id = session.id.clone();
                agg.messages_by_session.insert(id.clone(), Vec::new());
                agg.sessions.push(session);
                agg.active_session_id = Some(id.clone());
                id
            })
            .await?;
        log::info!("Created session {}", session_id);
        self.event_bus.emit(PanelEvent::SessionsChanged);
        self.emit_active();
        Ok(session_id)
    }

    /// Point at `session_id` if it exists. Returns false otherwise.
    pub async fn select_session(&self, session_id: &str) -> Result<bool> {
        let selected = self
            .mutate(|agg| {
                if agg.contains(session_id) {
                    agg.active_session_id = Some(session_id.to_string());
                    true
                } else {
                    false
                }
            })
            .await?;
        if selected {
            self.emit_active();
        } else {
            log::warn!("Ignoring selection of unknown session {}", session_id);
        }
        Ok(selected)
    }

    /// Remove a session and its transcript in one write. If it was active,
    /// the first remaining session becomes active, or none.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let deleted = self
            .mutate(|agg| {
                let before = agg.sessions.len();
                agg.sessions.retain(|s| s.id != session_id);
                if agg.sessions.len() == before {
                    return false;
                }
                agg.messages_by_session.remove(session_id);
                if !agg.active_pointer_is_valid() {
                    agg.active_session_id = agg.sessions.first().map(|s| s.id.clone());
                }
                true
            })
            .await?;
        if deleted {
            log::info!("Deleted session {}", session_id);
            self.event_bus.emit(PanelEvent::SessionsChanged);
            self.emit_active();
        }
        Ok(deleted)
    }

    // ─── Turn taking ─────────────────────────────────────────

    /// Append a user turn to the active session, relay the transcript, and
    /// append the one outcome. Blank input is a no-op and returns `None`.
    ///
    /// With no active session (all deleted) a fresh one is created for the
    /// turn. The reply lands in the session the turn was submitted to, even
    /// if another session is active by then.
    pub async fn submit_user_turn(&self, text: &str) -> Result<Option<TurnOutcome>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let user_message = Message::user(text);
        let (session_id, transcript, created) = self
            .mutate(|agg| {
                let (session_id, created) = match agg.active_session() {
                    Some(session) => (session.id.clone(), false),
                    None => {
                        let session = Session::new();
                        let id = session.id.clone();
                        agg.sessions.push(session);
                        agg.active_session_id = Some(id.clone());
                        (id, true)
                    }
                };
                if let Some(session) = agg.session_mut(&session_id) {
                    session.derive_title(text);
                }
                push_message(agg, &session_id, user_message.clone());
                let transcript = to_wire_transcript(agg.messages(&session_id));
                (session_id, transcript, created)
            })
            .await?;

        self.event_bus.emit(PanelEvent::SessionsChanged);
        if created {
            self.emit_active();
        }
        self.emit_appended(&session_id);

        *self.in_flight.borrow_mut().entry(session_id.clone()).or_insert(0) += 1;
        self.event_bus.emit(PanelEvent::RelayStarted {
            session_id: session_id.clone(),
        });
        log::debug!(
            "Relaying {} message(s) for {} via {}",
            transcript.len(),
            session_id,
            self.relay.relay_name()
        );

        let outcome = self.relay.query(QueryPayload::new(transcript)).await;
        self.settle_in_flight(&session_id);

        let ok = outcome.is_ok();
        let reply = match outcome {
            Ok(content) if content.trim().is_empty() => Message::assistant(EMPTY_REPLY),
            Ok(content) => Message::assistant(content),
            Err(e) => {
                log::warn!("Relay failed for {}: {}", session_id, e);
                Message::relay_error(&e)
            }
        };

        let appended = self.append_message(&session_id, reply).await;
        self.event_bus.emit(PanelEvent::RelayFinished {
            session_id: session_id.clone(),
            ok,
        });
        let reply_appended = appended?;

        Ok(Some(TurnOutcome {
            session_id,
            ok,
            reply_appended,
        }))
    }

    /// Submit whatever is in the draft, clearing it first.
    pub async fn submit_draft(&self) -> Result<Option<TurnOutcome>> {
        let text = {
            let mut draft = self.draft.borrow_mut();
            let text = draft.submittable();
            if text.is_some() {
                draft.clear();
            }
            text
        };
        match text {
            Some(text) => self.submit_user_turn(&text).await,
            None => Ok(None),
        }
    }

    /// Re-read the transcript and append one message. False if the session
    /// no longer exists.
    async fn append_message(&self, session_id: &str, message: Message) -> Result<bool> {
        let appended = self
            .mutate(|agg| {
                if !agg.contains(session_id) {
                    return false;
                }
                push_message(agg, session_id, message.clone());
                true
            })
            .await?;
        if appended {
            self.emit_appended(session_id);
        } else {
            log::warn!("Session {} was deleted before its reply arrived", session_id);
        }
        Ok(appended)
    }

    // ─── Draft ───────────────────────────────────────────────

    pub fn draft(&self) -> String {
        self.draft.borrow().text().to_string()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.draft.borrow_mut().set(text);
    }

    /// Feed a speech-to-text event. Final fragments extend the draft.
    pub fn apply_speech(&self, event: SpeechEvent) {
        match event {
            SpeechEvent::Fragment { text, is_final: true } => {
                let text = {
                    let mut draft = self.draft.borrow_mut();
                    draft.append_transcript(&text);
                    draft.text().to_string()
                };
                self.event_bus.emit(PanelEvent::DraftChanged { text });
            }
            SpeechEvent::Fragment { .. } => {}
            SpeechEvent::Started => log::debug!("Dictation started"),
            SpeechEvent::Ended => log::debug!("Dictation ended"),
            SpeechEvent::Error { message } => {
                log::warn!("Dictation error: {}", message);
            }
        }
    }

    // ─── Reads ───────────────────────────────────────────────

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.view.borrow().summaries()
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.view.borrow().active_session_id.clone()
    }

    pub fn active_messages(&self) -> Vec<Message> {
        self.active_session_id()
            .map(|id| self.messages(&id))
            .unwrap_or_default()
    }

    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.view.borrow().messages(session_id).to_vec()
    }

    /// Copy of the aggregate as this context last saw it
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> SessionAggregate {
        self.view.borrow().clone()
    }

    /// True while the active session waits on the relay
    pub fn is_sending(&self) -> bool {
        self.active_session_id()
            .is_some_and(|id| self.is_relaying(&id))
    }

    pub fn is_relaying(&self, session_id: &str) -> bool {
        self.in_flight.borrow().contains_key(session_id)
    }

    // ─── Internals ───────────────────────────────────────────

    /// Read → apply → save-if-unchanged, retried on conflict.
    async fn mutate<T, F>(&self, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut SessionAggregate) -> T,
    {
        let mut attempt = 1;
        loop {
            let snapshot = self.store.load().await?;
            let mut next = snapshot.aggregate.clone();
            let output = apply(&mut next);
            let patch = SessionPatch::diff(&snapshot.aggregate, &next);

            if patch.is_empty() {
                *self.view.borrow_mut() = next;
                return Ok(output);
            }

            match self.store.save(&patch, snapshot.revision).await {
                Ok(_) => {
                    *self.view.borrow_mut() = next;
                    return Ok(output);
                }
                Err(PanelError::Conflict { expected, found }) if attempt < MAX_SAVE_ATTEMPTS => {
                    log::warn!(
                        "Store moved from revision {} to {} under us, retrying (attempt {})",
                        expected,
                        found,
                        attempt
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn settle_in_flight(&self, session_id: &str) {
        let mut in_flight = self.in_flight.borrow_mut();
        if let Some(count) = in_flight.get_mut(session_id) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(session_id);
            }
        }
    }

    fn emit_active(&self) {
        self.event_bus.emit(PanelEvent::ActiveSessionChanged {
            session_id: self.active_session_id(),
        });
    }

    fn emit_appended(&self, session_id: &str) {
        let last = self.view.borrow().messages(session_id).last().cloned();
        if let Some(message) = last {
            self.event_bus.emit(PanelEvent::MessageAppended {
                session_id: session_id.to_string(),
                message,
            });
        }
    }
}

/// Seed an empty aggregate with the greeted welcome session, or repair a
/// dangling active pointer. Returns true if it seeded.
fn bootstrap(agg: &mut SessionAggregate) -> bool {
    if agg.sessions.is_empty() {
        let session = Session::new();
        let id = session.id.clone();
        agg.sessions.push(session);
        agg.messages_by_session
            .insert(id.clone(), vec![Message::assistant(WELCOME_GREETING)]);
        agg.active_session_id = Some(id);
        return true;
    }
    if !agg.active_pointer_is_valid() {
        agg.active_session_id = agg.sessions.first().map(|s| s.id.clone());
    }
    false
}

/// Append keeping timestamps non-decreasing within the transcript.
fn push_message(agg: &mut SessionAggregate, session_id: &str, mut message: Message) {
    let transcript = agg
        .messages_by_session
        .entry(session_id.to_string())
        .or_default();
    if let Some(last) = transcript.last() {
        message.timestamp = message.timestamp.max(last.timestamp);
    }
    transcript.push(message);
}
