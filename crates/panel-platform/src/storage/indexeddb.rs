//! IndexedDB storage backend.
//! Persistent across reloads and shared by every context of the extension
//! origin (the panel window and the background worker).
//! Uses web-sys bindings; request and transaction events are bridged to
//! futures through oneshot channels.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use web_sys::{IdbDatabase, IdbFactory, IdbObjectStore, IdbRequest, IdbTransaction, IdbTransactionMode};

use panel_core::ports::{parse_counter, StoragePort};
use panel_types::{PanelError, Result};

const DB_NAME: &str = "smartsat_panel";
const STORE_NAME: &str = "kv";
const DB_VERSION: u32 = 1;

type EventHandler = Closure<dyn FnMut(web_sys::Event)>;

pub struct IndexedDbStorage {
    db: IdbDatabase,
}

impl IndexedDbStorage {
    /// Open (or create) the IndexedDB database.
    pub async fn open() -> Result<Self> {
        let open_req = idb_factory()?
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(storage_err)?;

        // First open creates the object store
        let upgrade_req = open_req.clone();
        let on_upgrade = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let db = upgrade_req
                .result()
                .ok()
                .and_then(|r| r.dyn_into::<IdbDatabase>().ok());
            if let Some(db) = db {
                if let Err(e) = db.create_object_store(STORE_NAME) {
                    log::warn!("IndexedDB upgrade: {:?}", e);
                }
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let opened = RequestWatch::new(&open_req).settled().await;
        open_req.set_onupgradeneeded(None);
        drop(on_upgrade);

        let db: IdbDatabase = opened?.dyn_into().map_err(storage_err)?;
        Ok(Self { db })
    }

    fn transaction(&self, mode: IdbTransactionMode) -> Result<(IdbTransaction, IdbObjectStore)> {
        let tx = self
            .db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(storage_err)?;
        let store = tx.object_store(STORE_NAME).map_err(storage_err)?;
        Ok((tx, store))
    }
}

#[async_trait(?Send)]
impl StoragePort for IndexedDbStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_many(&[key]).await?.pop().flatten())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.set_many(&[(key.to_string(), value.to_vec())]).await
    }

    /// Every read is issued in one readonly transaction, so no write from
    /// another context can land between them.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let (_tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let watches = keys
            .iter()
            .map(|key| {
                let request = store.get(&JsValue::from_str(key)).map_err(storage_err)?;
                Ok(RequestWatch::new(&request))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(watches.len());
        for watch in watches {
            values.push(bytes_of(&watch.settled().await?));
        }
        Ok(values)
    }

    /// Every entry is put inside one readwrite transaction; either all of
    /// them commit or none do.
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let done = TransactionWatch::new(&tx);
        if let Err(e) = put_all(&store, entries) {
            let _ = tx.abort();
            return Err(e);
        }
        done.settled().await
    }

    /// The counter read and the puts share one readwrite transaction. The
    /// puts are issued from the read's success handler, while the
    /// transaction is still active.
    async fn set_many_if_counter(
        &self,
        counter_key: &str,
        expected: u64,
        entries: &[(String, Vec<u8>)],
    ) -> Result<u64> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let done = TransactionWatch::new(&tx);
        let read = store
            .get(&JsValue::from_str(counter_key))
            .map_err(storage_err)?;

        let found: Rc<RefCell<Option<Result<u64>>>> = Rc::new(RefCell::new(None));
        let on_read = {
            let found = found.clone();
            let read = read.clone();
            let tx = tx.clone();
            let entries = entries.to_vec();
            Closure::wrap(Box::new(move |_event: web_sys::Event| {
                let outcome = read
                    .result()
                    .map_err(storage_err)
                    .and_then(|value| parse_counter(bytes_of(&value).as_deref()));
                let write = match &outcome {
                    Ok(counter) if *counter == expected => put_all(&store, &entries),
                    Ok(_) => Ok(()),
                    Err(e) => Err(e.clone()),
                };
                if let Err(e) = write {
                    log::error!("Guarded write aborted: {}", e);
                    let _ = tx.abort();
                }
                *found.borrow_mut() = Some(outcome);
            }) as Box<dyn FnMut(web_sys::Event)>)
        };
        read.set_onsuccess(Some(on_read.as_ref().unchecked_ref()));

        let committed = done.settled().await;
        read.set_onsuccess(None);
        drop(on_read);

        let found = found.borrow_mut().take();
        match (found, committed) {
            (Some(Err(e)), _) | (_, Err(e)) => Err(e),
            (Some(Ok(counter)), Ok(())) => Ok(counter),
            (None, Ok(())) => Err(PanelError::Storage("counter read did not complete".to_string())),
        }
    }

    fn backend_name(&self) -> &str {
        "indexeddb"
    }
}

/// The IndexedDB factory of whichever global we run in.
fn idb_factory() -> Result<IdbFactory> {
    let global = js_sys::global();
    let factory = if let Some(window) = global.dyn_ref::<web_sys::Window>() {
        window.indexed_db()
    } else if let Some(scope) = global.dyn_ref::<web_sys::WorkerGlobalScope>() {
        scope.indexed_db()
    } else {
        return Err(PanelError::Storage("No window or worker global".to_string()));
    };
    factory
        .map_err(storage_err)?
        .ok_or_else(|| PanelError::Storage("IndexedDB not available".to_string()))
}

fn storage_err(e: JsValue) -> PanelError {
    PanelError::Storage(format!("{:?}", e))
}

fn put_all(store: &IdbObjectStore, entries: &[(String, Vec<u8>)]) -> Result<()> {
    for (key, value) in entries {
        let js_value = Uint8Array::from(value.as_slice());
        store
            .put_with_key(&js_value, &JsValue::from_str(key))
            .map_err(storage_err)?;
    }
    Ok(())
}

/// Stored bytes of a request result; a missing key reads as `None`.
fn bytes_of(value: &JsValue) -> Option<Vec<u8>> {
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(Uint8Array::new(value).to_vec())
    }
}

/// Success/error handlers of one request. They are installed as soon as
/// the watch is created and removed once it settles or is dropped.
struct RequestWatch {
    request: IdbRequest,
    rx: Option<oneshot::Receiver<std::result::Result<JsValue, JsValue>>>,
    _on_success: EventHandler,
    _on_error: EventHandler,
}

impl RequestWatch {
    fn new(request: &IdbRequest) -> Self {
        let (tx, rx) = oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_success = {
            let tx = tx.clone();
            let request = request.clone();
            Closure::wrap(Box::new(move |_event: web_sys::Event| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(request.result());
                }
            }) as Box<dyn FnMut(web_sys::Event)>)
        };
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(JsValue::from_str("IDB request failed")));
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        request.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        request.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        Self {
            request: request.clone(),
            rx: Some(rx),
            _on_success: on_success,
            _on_error: on_error,
        }
    }

    async fn settled(mut self) -> Result<JsValue> {
        let Some(rx) = self.rx.take() else {
            return Err(PanelError::Storage("IDB request already awaited".to_string()));
        };
        match rx.await {
            Ok(outcome) => outcome.map_err(storage_err),
            Err(_) => Err(PanelError::Storage("IDB request dropped".to_string())),
        }
    }
}

impl Drop for RequestWatch {
    fn drop(&mut self) {
        self.request.set_onsuccess(None);
        self.request.set_onerror(None);
    }
}

/// Complete/error/abort handlers of one transaction, removed on drop.
struct TransactionWatch {
    tx: IdbTransaction,
    rx: Option<oneshot::Receiver<Result<()>>>,
    _handlers: [EventHandler; 3],
}

impl TransactionWatch {
    fn new(tx: &IdbTransaction) -> Self {
        let (sender, rx) = oneshot::channel();
        let sender = Rc::new(RefCell::new(Some(sender)));
        let handler = |outcome: Result<()>| {
            let sender = sender.clone();
            Closure::wrap(Box::new(move |_event: web_sys::Event| {
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(outcome.clone());
                }
            }) as Box<dyn FnMut(web_sys::Event)>)
        };

        let on_complete = handler(Ok(()));
        let on_error = handler(Err(PanelError::Storage("IDB transaction failed".to_string())));
        let on_abort = handler(Err(PanelError::Storage("IDB transaction aborted".to_string())));
        tx.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
        tx.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        tx.set_onabort(Some(on_abort.as_ref().unchecked_ref()));

        Self {
            tx: tx.clone(),
            rx: Some(rx),
            _handlers: [on_complete, on_error, on_abort],
        }
    }

    /// Resolves when the transaction commits, fails if it errors or aborts.
    async fn settled(mut self) -> Result<()> {
        let Some(rx) = self.rx.take() else {
            return Err(PanelError::Storage("IDB transaction already awaited".to_string()));
        };
        rx.await
            .unwrap_or_else(|_| Err(PanelError::Storage("IDB transaction dropped".to_string())))
    }
}

impl Drop for TransactionWatch {
    fn drop(&mut self) {
        self.tx.set_oncomplete(None);
        self.tx.set_onerror(None);
        self.tx.set_onabort(None);
    }
}
