//! Request/response correlation over the panel ↔ background channel.
//!
//! Each outgoing query gets a numeric id and a oneshot slot in
//! [`PendingCalls`]. The reply with the same id fills the slot. When the
//! panel tears down, every open slot is failed so no caller waits forever.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use panel_types::{
    PanelError, Result,
    protocol::{ChannelReply, ChannelRequest, QueryPayload, QueryResponse},
};
use crate::ports::{ChannelTransport, RelayPort};

/// Open calls, keyed by request id
pub struct PendingCalls {
    next_id: Cell<u64>,
    pending: RefCell<HashMap<u64, oneshot::Sender<QueryResponse>>>,
    closed: Cell<bool>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            pending: RefCell::new(HashMap::new()),
            closed: Cell::new(false),
        }
    }

    /// Reserve an id and the slot its reply will land in.
    pub fn register(&self) -> Result<(u64, oneshot::Receiver<QueryResponse>)> {
        if self.closed.get() {
            return Err(PanelError::Cancelled("channel closed".to_string()));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let (sender, receiver) = oneshot::channel();
        self.pending.borrow_mut().insert(id, sender);
        Ok((id, receiver))
    }

    /// Deliver a reply. Returns false for unknown or already-settled ids.
    pub fn resolve(&self, reply: ChannelReply) -> bool {
        match self.pending.borrow_mut().remove(&reply.id) {
            Some(sender) => sender.send(reply.response).is_ok(),
            None => {
                log::warn!("Dropping reply for unknown request {}", reply.id);
                false
            }
        }
    }

    /// Drop a slot whose request never left (post failed).
    pub fn forget(&self, id: u64) {
        self.pending.borrow_mut().remove(&id);
    }

    /// Fail every open call but keep accepting new ones.
    pub fn fail_open(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.pending.borrow_mut().drain().collect();
        let count = drained.len();
        for (_, sender) in drained {
            let error = PanelError::Cancelled(reason.to_string()).to_string();
            let _ = sender.send(QueryResponse::failure(error));
        }
        if count > 0 {
            log::info!("Failed {} pending relay call(s): {}", count, reason);
        }
        count
    }

    /// Fail every open call and refuse new ones. Returns how many were open.
    pub fn abandon_all(&self, reason: &str) -> usize {
        self.closed.set(true);
        self.fail_open(reason)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

/// Panel side of the channel: a [`RelayPort`] that forwards each query to
/// the background mediator and waits for the matching reply.
pub struct ChannelClient<T: ChannelTransport> {
    transport: T,
    pending: Rc<PendingCalls>,
}

impl<T: ChannelTransport> ChannelClient<T> {
    pub fn new(transport: T, pending: Rc<PendingCalls>) -> Self {
        Self { transport, pending }
    }

    pub fn pending(&self) -> &Rc<PendingCalls> {
        &self.pending
    }

    /// React to the page going away. A cached page keeps its open calls:
    /// the background resumes with it and still replies. Returns true when
    /// the channel was closed.
    pub fn page_hidden(&self, exit: PageExit) -> bool {
        match exit {
            PageExit::Cached => false,
            PageExit::Unloaded => {
                self.pending.abandon_all("panel hidden");
                true
            }
        }
    }
}

/// How the page left, from `pagehide`'s `persisted` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageExit {
    /// Frozen in the back/forward cache; may be shown again.
    Cached,
    Unloaded,
}

impl PageExit {
    pub fn from_persisted(persisted: bool) -> Self {
        if persisted { Self::Cached } else { Self::Unloaded }
    }
}

#[async_trait(?Send)]
impl<T: ChannelTransport> RelayPort for ChannelClient<T> {
    async fn query(&self, payload: QueryPayload) -> Result<String> {
        let (id, receiver) = self.pending.register()?;
        let request = ChannelRequest::Query { id, payload };
        if let Err(e) = self.transport.post(&request) {
            self.pending.forget(id);
            return Err(e);
        }
        match receiver.await {
            Ok(response) => response.into_result(),
            Err(_) => Err(PanelError::Cancelled("channel closed".to_string())),
        }
    }

    fn relay_name(&self) -> &str {
        "channel"
    }
}

/// Background side: answer one request with one reply, whatever happens.
pub async fn serve_request(relay: &dyn RelayPort, request: ChannelRequest) -> ChannelReply {
    match request {
        ChannelRequest::Query { id, payload } => {
            let outcome = relay.query(payload).await;
            if let Err(e) = &outcome {
                log::warn!("Query {} failed: {}", id, e);
            }
            ChannelReply {
                id,
                response: QueryResponse::from(outcome),
            }
        }
    }
}
