//! Panel side of the panel ↔ background channel.
//!
//! Architecture:
//! - Panel (egui) ←→ module Web Worker running the mediator
//! - Requests and replies are JSON objects sent with postMessage
//! - Replies are matched to callers by id through [`PendingCalls`]
//!
//! Dropping the channel fails every open call and terminates the worker.

use std::rc::Rc;

use async_trait::async_trait;
use gloo_utils::format::JsValueSerdeExt;
use wasm_bindgen::prelude::*;
use web_sys::{ErrorEvent, MessageEvent, Worker, WorkerOptions, WorkerType};

use panel_core::channel::{ChannelClient, PageExit, PendingCalls};
use panel_core::ports::{ChannelTransport, RelayPort};
use panel_types::{
    PanelError, Result,
    protocol::{ChannelReply, ChannelRequest, QueryPayload},
};

/// Default location of the mediator worker bootstrap
pub const MEDIATOR_SCRIPT: &str = "./mediator.js";

/// Posts requests to the mediator worker.
#[derive(Clone)]
pub struct WorkerTransport {
    worker: Worker,
}

impl ChannelTransport for WorkerTransport {
    fn post(&self, request: &ChannelRequest) -> Result<()> {
        let value = JsValue::from_serde(request)?;
        self.worker
            .post_message(&value)
            .map_err(|e| PanelError::Channel(format!("postMessage failed: {:?}", e)))
    }
}

/// Relay that forwards every query to the mediator worker. Owns the
/// worker and the table of calls waiting on it.
pub struct ChannelRelay {
    worker: Worker,
    client: ChannelClient<WorkerTransport>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onerror: Closure<dyn FnMut(ErrorEvent)>,
}

impl ChannelRelay {
    /// Spawn the mediator as a module worker.
    pub fn spawn(script_url: &str) -> Result<Self> {
        let options = WorkerOptions::new();
        options.set_type(WorkerType::Module);

        let worker = Worker::new_with_options(script_url, &options)
            .map_err(|e| PanelError::Channel(format!("Failed to create mediator worker: {:?}", e)))?;

        let pending = Rc::new(PendingCalls::new());

        let pending_clone = pending.clone();
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            match event.data().into_serde::<ChannelReply>() {
                Ok(reply) => {
                    pending_clone.resolve(reply);
                }
                Err(e) => log::warn!("Ignoring malformed mediator message: {}", e),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        worker.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        // Worker errors fail whatever was waiting on it
        let pending_clone = pending.clone();
        let onerror = Closure::wrap(Box::new(move |event: ErrorEvent| {
            log::error!("Mediator worker error: {}", event.message());
            pending_clone.fail_open(&format!("mediator error: {}", event.message()));
        }) as Box<dyn FnMut(ErrorEvent)>);
        worker.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let client = ChannelClient::new(
            WorkerTransport {
                worker: worker.clone(),
            },
            pending,
        );

        log::info!("Mediator worker started from {}", script_url);
        Ok(Self {
            worker,
            client,
            _onmessage: onmessage,
            _onerror: onerror,
        })
    }

    pub fn pending(&self) -> &Rc<PendingCalls> {
        self.client.pending()
    }

    /// Fail open calls, refuse new ones, and stop the worker.
    pub fn teardown(&self, reason: &str) {
        if self.pending().is_closed() {
            return;
        }
        self.pending().abandon_all(reason);
        self.stop_worker(reason);
    }

    /// Called from `pagehide`. Only an unloading page loses the worker; a
    /// page restored from the back/forward cache keeps using it.
    pub fn page_hidden(&self, exit: PageExit) {
        if self.pending().is_closed() {
            return;
        }
        if self.client.page_hidden(exit) {
            self.stop_worker("panel hidden");
        }
    }

    fn stop_worker(&self, reason: &str) {
        self.worker.set_onmessage(None);
        self.worker.set_onerror(None);
        self.worker.terminate();
        log::info!("Mediator channel closed: {}", reason);
    }
}

#[async_trait(?Send)]
impl RelayPort for ChannelRelay {
    async fn query(&self, payload: QueryPayload) -> Result<String> {
        self.client.query(payload).await
    }

    fn relay_name(&self) -> &str {
        "channel"
    }
}

impl Drop for ChannelRelay {
    fn drop(&mut self) {
        self.teardown("panel closed");
    }
}
