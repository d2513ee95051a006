//! WASM-target tests for panel-platform (Node.js runtime).
//!
//! Tests MemoryStorage, the session and config stores on top of it, the
//! relay over an unconfigured store, and the speech adapter's unsupported
//! path under wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! IndexedDB, fetch and Worker need a browser and are not covered here.

use wasm_bindgen_test::*;

use futures::StreamExt;
use panel_core::config_store::StorageConfigSource;
use panel_core::event_bus::EventBus;
use panel_core::manager::SessionManager;
use panel_core::ports::{ConfigPort, RelayPort, SpeechPort, StoragePort};
use panel_core::relay::HttpRelay;
use panel_core::store::{SessionPatch, SessionStore};
use panel_platform::relay::FetchTransport;
use panel_platform::speech::WebSpeechRecognizer;
use panel_platform::storage::MemoryStorage;
use panel_types::config::{RelayConfig, NOT_CONFIGURED_MESSAGE};
use panel_types::event::SpeechEvent;
use panel_types::protocol::QueryPayload;
use std::rc::Rc;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    let result = storage.get("nonexistent").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_set_and_get() {
    let storage = MemoryStorage::new();
    storage.set("key1", b"value1").await.unwrap();
    let result = storage.get("key1").await.unwrap();
    assert_eq!(result, Some(b"value1".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_overwrite() {
    let storage = MemoryStorage::new();
    storage.set("key", b"v1").await.unwrap();
    storage.set("key", b"v2").await.unwrap();
    assert_eq!(storage.get("key").await.unwrap(), Some(b"v2".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_get_many_keeps_key_order() {
    let storage = MemoryStorage::new();
    storage.set("b", b"2").await.unwrap();
    storage.set("a", b"1").await.unwrap();

    let values = storage.get_many(&["a", "missing", "b"]).await.unwrap();
    assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"2".to_vec())]);
}

#[wasm_bindgen_test]
async fn memory_storage_guarded_write() {
    let storage = MemoryStorage::new();
    storage.set("rev", b"4").await.unwrap();
    storage.set("data", b"old").await.unwrap();

    let entries = [
        ("rev".to_string(), b"5".to_vec()),
        ("data".to_string(), b"new".to_vec()),
    ];
    // Stale counter: nothing is written
    assert_eq!(storage.set_many_if_counter("rev", 3, &entries).await.unwrap(), 4);
    assert_eq!(storage.get("data").await.unwrap(), Some(b"old".to_vec()));

    assert_eq!(storage.set_many_if_counter("rev", 4, &entries).await.unwrap(), 4);
    assert_eq!(storage.get("rev").await.unwrap(), Some(b"5".to_vec()));
    assert_eq!(storage.get("data").await.unwrap(), Some(b"new".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_guarded_write_missing_counter_is_zero() {
    let storage = MemoryStorage::new();
    let entries = [("rev".to_string(), b"1".to_vec())];
    assert_eq!(storage.set_many_if_counter("rev", 0, &entries).await.unwrap(), 0);
    assert_eq!(storage.get("rev").await.unwrap(), Some(b"1".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_set_many() {
    let storage = MemoryStorage::new();
    storage
        .set_many(&[
            ("a".to_string(), b"1".to_vec()),
            ("b".to_string(), b"2".to_vec()),
        ])
        .await
        .unwrap();
    assert_eq!(storage.get("a").await.unwrap(), Some(b"1".to_vec()));
    assert_eq!(storage.get("b").await.unwrap(), Some(b"2".to_vec()));
}

// ─── Stores on MemoryStorage ─────────────────────────────

#[wasm_bindgen_test]
async fn session_store_revision_advances() {
    let store = SessionStore::new(Rc::new(MemoryStorage::new()));
    let snapshot = store.load().await.unwrap();
    assert_eq!(snapshot.revision, 0);

    let patch = SessionPatch {
        active_session_id: Some(None),
        ..SessionPatch::default()
    };
    assert_eq!(store.save(&patch, 0).await.unwrap(), 1);
    assert!(store.save(&patch, 0).await.is_err());
    assert_eq!(store.save(&patch, 1).await.unwrap(), 2);
}

#[wasm_bindgen_test]
async fn config_is_shared_between_contexts() {
    // Panel and mediator each wrap the same backing store
    let storage: Rc<dyn StoragePort> = Rc::new(MemoryStorage::new());
    let panel = StorageConfigSource::new(storage.clone());
    let mediator = StorageConfigSource::new(storage);

    panel
        .save_relay_config(&RelayConfig::new(" https://assistant.test ").with_api_key("k"))
        .await
        .unwrap();
    let seen = mediator.load_relay_config().await.unwrap();
    assert_eq!(seen.endpoint_url, "https://assistant.test");
    assert_eq!(seen.bearer().as_deref(), Some("Bearer k"));
}

#[wasm_bindgen_test]
async fn unconfigured_relay_fails_before_fetch() {
    let storage: Rc<dyn StoragePort> = Rc::new(MemoryStorage::new());
    let relay = HttpRelay::new(Rc::new(StorageConfigSource::new(storage)), FetchTransport);
    let err = relay.query(QueryPayload::new(vec![])).await.unwrap_err();
    assert_eq!(err.to_string(), NOT_CONFIGURED_MESSAGE);
}

#[wasm_bindgen_test]
async fn manager_on_memory_storage() {
    let storage: Rc<dyn StoragePort> = Rc::new(MemoryStorage::new());
    let relay = Rc::new(HttpRelay::new(
        Rc::new(StorageConfigSource::new(storage.clone())),
        FetchTransport,
    ));
    let manager = SessionManager::new(SessionStore::new(storage), relay, EventBus::new());
    manager.load().await.unwrap();

    let outcome = manager.submit_user_turn("hello").await.unwrap().unwrap();
    assert!(!outcome.ok);
    let messages = manager.active_messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[2].is_error());
}

// ─── Speech Tests ────────────────────────────────────────

#[wasm_bindgen_test]
async fn speech_unsupported_reports_and_ends() {
    let speech = WebSpeechRecognizer::new("en-US");
    assert!(!speech.is_supported());
    assert!(!speech.is_listening());

    let events: Vec<SpeechEvent> = speech.start().collect().await;
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], SpeechEvent::Error { .. }));
    assert_eq!(events[1], SpeechEvent::Ended);
    speech.stop();
}
