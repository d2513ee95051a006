//! Web Speech API adapter for dictation.
//!
//! `SpeechRecognition` is not in web-sys, so the recognizer is driven
//! through `js_sys::Reflect`. Each `start()` builds a fresh recognizer and
//! returns a stream of [`SpeechEvent`]s that ends after `Ended`.

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::stream::{self, Stream};
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;

use panel_core::ports::SpeechPort;
use panel_types::event::SpeechEvent;

const RECOGNIZER_NAMES: [&str; 2] = ["SpeechRecognition", "webkitSpeechRecognition"];

pub struct WebSpeechRecognizer {
    lang: String,
    listening: Rc<Cell<bool>>,
    active: RefCell<Option<ActiveRecognition>>,
}

struct ActiveRecognition {
    recognition: JsValue,
    _handlers: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl WebSpeechRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            listening: Rc::new(Cell::new(false)),
            active: RefCell::new(None),
        }
    }

    /// Recognizer for the browser's UI language, `en-US` if unknown
    pub fn for_browser_language() -> Self {
        let lang = web_sys::window()
            .and_then(|w| w.navigator().language())
            .unwrap_or_else(|| "en-US".to_string());
        Self::new(lang)
    }

    fn begin(&self) -> Result<mpsc::UnboundedReceiver<SpeechEvent>, JsValue> {
        let ctor = recognizer_constructor()
            .ok_or_else(|| JsValue::from_str("Speech recognition not supported"))?;
        let recognition = Reflect::construct(&ctor, &js_sys::Array::new())?;
        Reflect::set(&recognition, &"lang".into(), &JsValue::from_str(&self.lang))?;
        Reflect::set(&recognition, &"continuous".into(), &JsValue::FALSE)?;
        Reflect::set(&recognition, &"interimResults".into(), &JsValue::TRUE)?;

        let (tx, rx) = mpsc::unbounded();
        let mut handlers = Vec::new();

        let on_start = {
            let tx = tx.clone();
            let listening = self.listening.clone();
            Closure::wrap(Box::new(move |_event: JsValue| {
                listening.set(true);
                let _ = tx.unbounded_send(SpeechEvent::Started);
            }) as Box<dyn FnMut(JsValue)>)
        };
        let on_result = {
            let tx = tx.clone();
            Closure::wrap(Box::new(move |event: JsValue| {
                for fragment in result_fragments(&event) {
                    let _ = tx.unbounded_send(fragment);
                }
            }) as Box<dyn FnMut(JsValue)>)
        };
        let on_error = {
            let tx = tx.clone();
            Closure::wrap(Box::new(move |event: JsValue| {
                let message = Reflect::get(&event, &"error".into())
                    .ok()
                    .and_then(|v| v.as_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let _ = tx.unbounded_send(SpeechEvent::Error { message });
            }) as Box<dyn FnMut(JsValue)>)
        };
        let on_end = {
            let listening = self.listening.clone();
            Closure::wrap(Box::new(move |_event: JsValue| {
                listening.set(false);
                let _ = tx.unbounded_send(SpeechEvent::Ended);
                tx.close_channel();
            }) as Box<dyn FnMut(JsValue)>)
        };

        for (name, handler) in [
            ("onstart", on_start),
            ("onresult", on_result),
            ("onerror", on_error),
            ("onend", on_end),
        ] {
            Reflect::set(&recognition, &name.into(), handler.as_ref())?;
            handlers.push(handler);
        }

        call_method(&recognition, "start")?;
        *self.active.borrow_mut() = Some(ActiveRecognition {
            recognition,
            _handlers: handlers,
        });
        Ok(rx)
    }

    /// Abort the current recognizer and unhook its handlers before they
    /// are dropped.
    fn detach(&self) {
        if let Some(active) = self.active.borrow_mut().take() {
            for name in ["onstart", "onresult", "onerror", "onend"] {
                let _ = Reflect::set(&active.recognition, &name.into(), &JsValue::NULL);
            }
            if let Err(e) = call_method(&active.recognition, "abort") {
                log::debug!("Aborting previous recognizer failed: {:?}", e);
            }
        }
        self.listening.set(false);
    }
}

impl Default for WebSpeechRecognizer {
    fn default() -> Self {
        Self::for_browser_language()
    }
}

impl SpeechPort for WebSpeechRecognizer {
    fn is_supported(&self) -> bool {
        recognizer_constructor().is_some()
    }

    fn start(&self) -> Pin<Box<dyn Stream<Item = SpeechEvent>>> {
        self.detach();
        match self.begin() {
            Ok(rx) => Box::pin(rx),
            Err(e) => {
                let message = e.as_string().unwrap_or_else(|| format!("{:?}", e));
                log::warn!("Dictation could not start: {}", message);
                Box::pin(stream::iter(vec![
                    SpeechEvent::Error { message },
                    SpeechEvent::Ended,
                ]))
            }
        }
    }

    fn stop(&self) {
        if let Some(active) = self.active.borrow().as_ref() {
            if self.listening.get() {
                if let Err(e) = call_method(&active.recognition, "stop") {
                    log::warn!("Stopping dictation failed: {:?}", e);
                }
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.get()
    }
}

fn recognizer_constructor() -> Option<Function> {
    let global = js_sys::global();
    RECOGNIZER_NAMES.iter().find_map(|name| {
        Reflect::get(&global, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.dyn_into::<Function>().ok())
    })
}

fn call_method(target: &JsValue, name: &str) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &name.into())?.dyn_into()?;
    method.call0(target)
}

/// Fragments of a `result` event, from `resultIndex` on.
fn result_fragments(event: &JsValue) -> Vec<SpeechEvent> {
    let get = |target: &JsValue, key: &str| Reflect::get(target, &key.into()).ok();
    let Some(results) = get(event, "results") else {
        return Vec::new();
    };
    let start = get(event, "resultIndex").and_then(|v| v.as_f64()).unwrap_or(0.0) as u32;
    let length = get(&results, "length").and_then(|v| v.as_f64()).unwrap_or(0.0) as u32;

    (start..length)
        .filter_map(|i| {
            let result = Reflect::get_u32(&results, i).ok()?;
            let is_final = get(&result, "isFinal").and_then(|v| v.as_bool()).unwrap_or(false);
            let best = Reflect::get_u32(&result, 0).ok()?;
            let text = get(&best, "transcript")?.as_string()?;
            Some(SpeechEvent::Fragment { text, is_final })
        })
        .collect()
}
