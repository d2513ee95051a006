//! WASM-target tests for panel-core.
//!
//! Runs the event bus, relay response handling, the channel correlation
//! table and the session manager under wasm32-unknown-unknown via
//! `wasm-pack test --node`.

use wasm_bindgen_test::*;

use panel_core::channel::{serve_request, ChannelClient, PendingCalls};
use panel_core::event_bus::EventBus;
use panel_core::manager::SessionManager;
use panel_core::ports::*;
use panel_core::relay::{interpret_response, HttpRelay};
use panel_core::store::SessionStore;
use panel_types::config::{RelayConfig, NOT_CONFIGURED_MESSAGE};
use panel_types::event::PanelEvent;
use panel_types::message::*;
use panel_types::protocol::*;
use panel_types::session::WELCOME_GREETING;
use panel_types::PanelError;

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

// ─── EventBus Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn event_bus_new_is_empty() {
    let bus = EventBus::new();
    assert!(!bus.has_pending());
    assert!(bus.drain().is_empty());
}

#[wasm_bindgen_test]
fn event_bus_emit_and_drain() {
    let bus = EventBus::new();
    bus.emit(PanelEvent::SessionsChanged);
    bus.emit(PanelEvent::DraftChanged { text: "hello".to_string() });
    assert!(bus.has_pending());
    assert_eq!(bus.drain().len(), 2);
    assert!(!bus.has_pending());
}

// ─── Relay Response Tests ────────────────────────────────

#[wasm_bindgen_test]
fn relay_reply_fields() {
    assert_eq!(interpret_response(200, r#"{"content":"a"}"#).unwrap(), "a");
    assert_eq!(interpret_response(200, r#"{"message":"b"}"#).unwrap(), "b");
    assert_eq!(interpret_response(200, r#"{"reply":"hi"}"#).unwrap(), "hi");
    assert_eq!(interpret_response(200, "plain").unwrap(), "plain");
}

#[wasm_bindgen_test]
fn relay_http_error_text() {
    let err = interpret_response(500, "oops").unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: oops");
}

// ─── Channel Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn pending_calls_ids_are_unique() {
    let pending = PendingCalls::new();
    let (a, _ra) = pending.register().unwrap();
    let (b, _rb) = pending.register().unwrap();
    assert_ne!(a, b);
    assert_eq!(pending.abandon_all("test"), 2);
    assert!(pending.register().is_err());
}

// ─── Mocks ───────────────────────────────────────────────

#[derive(Default)]
struct MockKv {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

#[async_trait(?Send)]
impl StoragePort for MockKv {
    async fn get(&self, key: &str) -> panel_types::Result<Option<Vec<u8>>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> panel_types::Result<()> {
        self.data.borrow_mut().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct EchoRelay;

#[async_trait(?Send)]
impl RelayPort for EchoRelay {
    async fn query(&self, payload: QueryPayload) -> panel_types::Result<String> {
        let last = payload.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("echo: {}", last))
    }

    fn relay_name(&self) -> &str {
        "echo"
    }
}

#[derive(Clone, Default)]
struct CountingHttp {
    calls: Rc<RefCell<usize>>,
}

#[async_trait(?Send)]
impl HttpTransport for CountingHttp {
    async fn post_json(
        &self,
        _url: &str,
        _authorization: Option<&str>,
        _body: String,
    ) -> panel_types::Result<HttpReply> {
        *self.calls.borrow_mut() += 1;
        Ok(HttpReply { status: 200, body: r#"{"content":"unused"}"#.to_string() })
    }
}

struct Unconfigured;

#[async_trait(?Send)]
impl ConfigPort for Unconfigured {
    async fn load_relay_config(&self) -> panel_types::Result<RelayConfig> {
        Ok(RelayConfig::default())
    }

    async fn save_relay_config(&self, _config: &RelayConfig) -> panel_types::Result<()> {
        Ok(())
    }
}

/// Delivers each request straight to an in-process mediator.
#[derive(Clone, Default)]
struct Outbox {
    sent: Rc<RefCell<VecDeque<ChannelRequest>>>,
}

impl ChannelTransport for Outbox {
    fn post(&self, request: &ChannelRequest) -> panel_types::Result<()> {
        self.sent.borrow_mut().push_back(request.clone());
        Ok(())
    }
}

fn manager(relay: Rc<dyn RelayPort>) -> (SessionManager, EventBus) {
    let bus = EventBus::new();
    let store = SessionStore::new(Rc::new(MockKv::default()));
    (SessionManager::new(store, relay, bus.clone()), bus)
}

// ─── Session Manager Tests (async) ───────────────────────

#[wasm_bindgen_test]
async fn manager_first_run_and_turn() {
    let (manager, bus) = manager(Rc::new(EchoRelay));
    manager.load().await.unwrap();
    assert_eq!(manager.active_messages()[0].content, WELCOME_GREETING);

    let outcome = manager.submit_user_turn("ping").await.unwrap().unwrap();
    assert!(outcome.ok);

    let messages = manager.active_messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].content, "echo: ping");
    assert_eq!(manager.sessions()[0].title, "ping");

    let events = bus.drain();
    assert!(events.iter().any(|e| matches!(e, PanelEvent::RelayFinished { ok: true, .. })));
}

#[wasm_bindgen_test]
async fn manager_unconfigured_never_hits_network() {
    let http = CountingHttp::default();
    let relay = HttpRelay::new(Rc::new(Unconfigured), http.clone());
    let (manager, _) = manager(Rc::new(relay));
    manager.load().await.unwrap();

    manager.submit_user_turn("hello").await.unwrap();
    let last = manager.active_messages().last().unwrap().clone();
    assert!(last.is_error());
    assert!(last.content.contains(NOT_CONFIGURED_MESSAGE));
    assert_eq!(*http.calls.borrow(), 0);
}

#[wasm_bindgen_test]
async fn manager_delete_all_then_submit() {
    let (manager, _) = manager(Rc::new(EchoRelay));
    manager.load().await.unwrap();
    let only = manager.active_session_id().unwrap();
    manager.delete_session(&only).await.unwrap();
    assert!(manager.active_session_id().is_none());

    manager.submit_user_turn("again").await.unwrap();
    assert_eq!(manager.sessions().len(), 1);
    assert!(manager.active_session_id().is_some());
}

#[wasm_bindgen_test]
async fn channel_client_served_by_mediator() {
    let outbox = Outbox::default();
    let pending = Rc::new(PendingCalls::new());
    let client = ChannelClient::new(outbox.clone(), pending.clone());

    let call = client.query(QueryPayload::new(vec![WireMessage {
        role: Role::User,
        content: "over the channel".to_string(),
    }]));
    futures::pin_mut!(call);

    // First poll posts the request, then waits on the reply slot
    assert!(futures::poll!(call.as_mut()).is_pending());
    let request = outbox.sent.borrow_mut().pop_front().unwrap();
    let reply = serve_request(&EchoRelay, request).await;
    assert!(pending.resolve(reply));

    assert_eq!(call.await.unwrap(), "echo: over the channel");
}

#[wasm_bindgen_test]
async fn channel_teardown_fails_open_calls() {
    let pending = Rc::new(PendingCalls::new());
    let client = ChannelClient::new(Outbox::default(), pending.clone());
    let call = client.query(QueryPayload::new(vec![]));
    futures::pin_mut!(call);
    assert!(futures::poll!(call.as_mut()).is_pending());

    pending.abandon_all("panel closed");
    let err = call.await.unwrap_err();
    assert!(matches!(err, PanelError::Relay(_) | PanelError::Cancelled(_)));
}
