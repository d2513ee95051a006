//! SMARTSAT panel app — WASM entry points.
//!
//! This crate is the composition root (DI wiring layer). The same module
//! is loaded in two contexts: the side panel, which starts the egui app,
//! and the background worker, which calls [`mediator_main`].

mod app;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use panel_platform::mediator::Mediator;
use panel_platform::storage::auto_detect_storage;

/// Canvas the panel page provides for egui
const CANVAS_ID: &str = "panel_canvas";

/// Panel entry point, called from the panel page once the module loads
#[wasm_bindgen]
pub fn panel_main() -> Result<(), JsValue> {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("SMARTSAT panel starting...");

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| JsValue::from_str(&format!("No canvas element with id '{}'", CANVAS_ID)))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("Element is not a canvas"))?;

    let web_options = eframe::WebOptions::default();
    wasm_bindgen_futures::spawn_local(async move {
        let started = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(app::PanelApp::new(cc)))),
            )
            .await;
        if let Err(e) = started {
            log::error!("Failed to start eframe: {:?}", e);
        }
    });
    Ok(())
}

/// Background entry point, called from `mediator.js` inside the worker
#[wasm_bindgen]
pub async fn mediator_main() -> Result<(), JsValue> {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("SMARTSAT mediator starting...");

    let storage = auto_detect_storage().await;
    Mediator::over_http(storage)
        .install()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
