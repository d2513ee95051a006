//! Background mediator — the worker end of the panel ↔ background channel.
//!
//! Each `query` request is answered with exactly one reply carrying the
//! same id. Settings are read from storage per request, so a change saved
//! in the options view applies to the next query without a restart.
//! Messages that are not recognized requests are ignored.

use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use wasm_bindgen::prelude::*;
use web_sys::{DedicatedWorkerGlobalScope, MessageEvent};

use panel_core::channel::serve_request;
use panel_core::config_store::StorageConfigSource;
use panel_core::ports::{RelayPort, StoragePort};
use panel_core::relay::HttpRelay;
use panel_types::{PanelError, Result, protocol::ChannelRequest};

use crate::relay::FetchTransport;

/// Answers channel requests with a relay, one reply per request.
pub struct Mediator {
    relay: Rc<dyn RelayPort>,
}

impl Mediator {
    pub fn new(relay: Rc<dyn RelayPort>) -> Self {
        Self { relay }
    }

    /// Direct HTTP relay with settings read from `storage` per request.
    pub fn over_http(storage: Rc<dyn StoragePort>) -> Self {
        let config = Rc::new(StorageConfigSource::new(storage));
        Self::new(Rc::new(HttpRelay::new(config, FetchTransport)))
    }

    /// Install the request handler on the current dedicated worker scope.
    pub fn install(self) -> Result<()> {
        let scope: DedicatedWorkerGlobalScope = js_sys::global()
            .dyn_into()
            .map_err(|_| PanelError::JsInterop("mediator must run in a dedicated worker".to_string()))?;

        let relay = self.relay;
        let reply_scope = scope.clone();
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            let request = match event.data().into_serde::<ChannelRequest>() {
                Ok(request) => request,
                Err(e) => {
                    log::debug!("Ignoring non-request message: {}", e);
                    return;
                }
            };

            let relay = relay.clone();
            let scope = reply_scope.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let reply = serve_request(relay.as_ref(), request).await;
                let posted = JsValue::from_serde(&reply)
                    .map_err(PanelError::from)
                    .and_then(|value| {
                        scope
                            .post_message(&value)
                            .map_err(|e| PanelError::Channel(format!("{:?}", e)))
                    });
                if let Err(e) = posted {
                    log::error!("Could not deliver reply {}: {}", reply.id, e);
                }
            });
        }) as Box<dyn FnMut(MessageEvent)>);

        scope.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
        log::info!("Mediator listening");
        Ok(())
    }
}
