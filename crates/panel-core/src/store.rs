//! Session store: the persisted aggregate on top of a [`StoragePort`].
//!
//! Each container lives under its own key and is replaced whole on save.
//! A `revision` counter key is bumped with every save; a save carrying a
//! stale revision is refused with [`PanelError::Conflict`] so the caller can
//! re-read and re-apply its change.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use panel_types::{
    PanelError, Result,
    message::Message,
    session::{Session, SessionAggregate},
};
use crate::ports::{parse_counter, StoragePort};

pub const SESSIONS_KEY: &str = "sessions";
pub const MESSAGES_KEY: &str = "messagesBySession";
pub const ACTIVE_SESSION_KEY: &str = "activeSessionId";
pub const REVISION_KEY: &str = "revision";

/// The aggregate as read, tagged with the revision it was read at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub aggregate: SessionAggregate,
    pub revision: u64,
}

/// Containers to replace. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub sessions: Option<Vec<Session>>,
    pub messages_by_session: Option<BTreeMap<String, Vec<Message>>>,
    pub active_session_id: Option<Option<String>>,
}

impl SessionPatch {
    /// Every container of `after` that differs from `before`
    pub fn diff(before: &SessionAggregate, after: &SessionAggregate) -> Self {
        Self {
            sessions: (before.sessions != after.sessions).then(|| after.sessions.clone()),
            messages_by_session: (before.messages_by_session != after.messages_by_session)
                .then(|| after.messages_by_session.clone()),
            active_session_id: (before.active_session_id != after.active_session_id)
                .then(|| after.active_session_id.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_none()
            && self.messages_by_session.is_none()
            && self.active_session_id.is_none()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Rc<dyn StoragePort>,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }

    /// Latest persisted snapshot. Keys never written read as empty defaults.
    ///
    /// The revision is read first: a save that lands between the reads
    /// leaves this snapshot with an older revision than its data, so the
    /// next save is refused instead of overwriting it.
    pub async fn load(&self) -> Result<Snapshot> {
        let values = self
            .storage
            .get_many(&[REVISION_KEY, SESSIONS_KEY, MESSAGES_KEY, ACTIVE_SESSION_KEY])
            .await?;
        let [revision, sessions, messages, active]: [Option<Vec<u8>>; 4] = values
            .try_into()
            .map_err(|_| PanelError::Storage("short read from session store".to_string()))?;

        let revision = parse_counter(revision.as_deref())?;
        let sessions: Vec<Session> = decode(sessions)?.unwrap_or_default();
        let messages_by_session = decode(messages)?.unwrap_or_default();
        let active_session_id = decode::<Option<String>>(active)?.flatten();

        Ok(Snapshot {
            aggregate: SessionAggregate {
                sessions,
                messages_by_session,
                active_session_id,
            },
            revision,
        })
    }

    /// Like [`load`](Self::load), but an unreadable store yields empty defaults.
    pub async fn load_or_default(&self) -> Snapshot {
        match self.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!(
                    "Session store unreadable on {} ({}), using empty defaults",
                    self.backend_name(),
                    e
                );
                Snapshot::default()
            }
        }
    }

    /// Replace the patched containers and bump the revision in one batch.
    /// Refused with `Conflict` if someone saved since `expected_revision`;
    /// the check and the write are one storage step.
    pub async fn save(&self, patch: &SessionPatch, expected_revision: u64) -> Result<u64> {
        let next = expected_revision + 1;
        let mut entries = Vec::with_capacity(4);
        if let Some(sessions) = &patch.sessions {
            entries.push(encode(SESSIONS_KEY, sessions)?);
        }
        if let Some(messages) = &patch.messages_by_session {
            entries.push(encode(MESSAGES_KEY, messages)?);
        }
        if let Some(active) = &patch.active_session_id {
            entries.push(encode(ACTIVE_SESSION_KEY, active)?);
        }
        entries.push(encode(REVISION_KEY, &next)?);

        let found = self
            .storage
            .set_many_if_counter(REVISION_KEY, expected_revision, &entries)
            .await?;
        if found != expected_revision {
            return Err(PanelError::Conflict {
                expected: expected_revision,
                found,
            });
        }
        log::debug!("Session store saved revision {} ({} keys)", next, entries.len());
        Ok(next)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<(String, Vec<u8>)> {
    Ok((key.to_string(), serde_json::to_vec(value)?))
}

fn decode<T: DeserializeOwned>(raw: Option<Vec<u8>>) -> Result<Option<T>> {
    match raw {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
