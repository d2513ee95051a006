//! Main egui application — composes the panels around the session manager.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use futures::StreamExt;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::prelude::*;

use panel_core::channel::PageExit;
use panel_core::config_store::StorageConfigSource;
use panel_core::event_bus::EventBus;
use panel_core::manager::SessionManager;
use panel_core::ports::{ConfigPort, RelayPort, SpeechPort};
use panel_core::relay::HttpRelay;
use panel_core::store::SessionStore;
use panel_platform::relay::{ChannelRelay, FetchTransport, MEDIATOR_SCRIPT};
use panel_platform::speech::WebSpeechRecognizer;
use panel_platform::storage::auto_detect_storage;
use panel_ui::panels::chat::{self, ChatAction};
use panel_ui::panels::sessions::{self, SessionsAction};
use panel_ui::panels::settings::{self, SaveFeedback, SettingsAction};
use panel_ui::state::{PanelView, SettingsForm, UiState};
use panel_ui::theme;

/// How long the "Saved" note stays up
const FEEDBACK_MS: u32 = 1500;

/// Everything that needs storage, built once storage has opened
#[derive(Clone)]
struct Services {
    manager: Rc<SessionManager>,
    config: Rc<StorageConfigSource>,
    /// Present when the mediator worker started
    channel: Option<Rc<ChannelRelay>>,
}

/// The main application state
pub struct PanelApp {
    ui_state: UiState,
    event_bus: EventBus,
    services: Rc<RefCell<Option<Services>>>,
    settings_form: SettingsForm,
    /// Settings read from storage, picked up on the next frame
    loaded_form: Rc<RefCell<Option<SettingsForm>>>,
    save_feedback: Rc<RefCell<Option<SaveFeedback>>>,
    speech: Rc<WebSpeechRecognizer>,
    first_frame: bool,
}

impl PanelApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let event_bus = EventBus::new();
        let speech = Rc::new(WebSpeechRecognizer::for_browser_language());

        let mut ui_state = UiState::new();
        ui_state.speech_supported = speech.is_supported();

        let app = Self {
            ui_state,
            event_bus: event_bus.clone(),
            services: Rc::new(RefCell::new(None)),
            settings_form: SettingsForm::default(),
            loaded_form: Rc::new(RefCell::new(None)),
            save_feedback: Rc::new(RefCell::new(None)),
            speech,
            first_frame: true,
        };

        Self::init_services(
            cc.egui_ctx.clone(),
            event_bus,
            app.services.clone(),
            app.loaded_form.clone(),
        );
        Self::install_page_hooks(app.services.clone(), app.speech.clone());
        app
    }

    /// Open storage, connect the relay and load the sessions (async)
    fn init_services(
        ctx: egui::Context,
        event_bus: EventBus,
        slot: Rc<RefCell<Option<Services>>>,
        loaded_form: Rc<RefCell<Option<SettingsForm>>>,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            let storage = auto_detect_storage().await;
            let config = Rc::new(StorageConfigSource::new(storage.clone()));

            let (relay, channel): (Rc<dyn RelayPort>, Option<Rc<ChannelRelay>>) =
                match ChannelRelay::spawn(MEDIATOR_SCRIPT) {
                    Ok(channel) => {
                        let channel = Rc::new(channel);
                        (channel.clone() as Rc<dyn RelayPort>, Some(channel))
                    }
                    Err(e) => {
                        log::warn!("Mediator unavailable ({}), calling the endpoint directly", e);
                        let direct = HttpRelay::new(config.clone(), FetchTransport);
                        (Rc::new(direct) as Rc<dyn RelayPort>, None)
                    }
                };
            log::info!("Relay: {}", relay.relay_name());

            let manager = Rc::new(SessionManager::new(
                SessionStore::new(storage),
                relay,
                event_bus,
            ));
            // Failure is already reported on the event bus; the panel runs
            // on in-memory defaults.
            if let Err(e) = manager.load().await {
                log::error!("Initial load failed: {}", e);
            }

            match config.load_relay_config().await {
                Ok(relay_config) => {
                    *loaded_form.borrow_mut() = Some(SettingsForm::from_config(&relay_config));
                }
                Err(e) => log::warn!("Could not read relay settings: {}", e),
            }

            *slot.borrow_mut() = Some(Services {
                manager,
                config,
                channel,
            });
            ctx.request_repaint();
        });
    }

    /// Close the channel when the page unloads; re-read the store when it
    /// becomes visible again, since another panel may have written.
    fn install_page_hooks(slot: Rc<RefCell<Option<Services>>>, speech: Rc<WebSpeechRecognizer>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let hide_slot = slot.clone();
        let on_pagehide = Closure::wrap(Box::new(move |event: web_sys::Event| {
            speech.stop();
            let persisted = event
                .dyn_ref::<web_sys::PageTransitionEvent>()
                .is_some_and(|e| e.persisted());
            if let Some(channel) = hide_slot.borrow().as_ref().and_then(|s| s.channel.clone()) {
                channel.page_hidden(PageExit::from_persisted(persisted));
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        let on_pageshow = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let Some(services) = slot.borrow().clone() else {
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = services.manager.refresh().await {
                    log::warn!("Refresh failed: {}", e);
                }
            });
        }) as Box<dyn FnMut(web_sys::Event)>);

        for (name, handler) in [("pagehide", &on_pagehide), ("pageshow", &on_pageshow)] {
            if let Err(e) =
                window.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())
            {
                log::warn!("Could not listen for {}: {:?}", name, e);
            }
        }
        on_pagehide.forget();
        on_pageshow.forget();
    }

    fn services(&self) -> Option<Services> {
        self.services.borrow().clone()
    }

    fn sync_from_manager(&mut self) {
        if let Some(services) = self.services() {
            self.ui_state.apply_view(PanelView::capture(&services.manager));
        }
    }
}

impl eframe::App for PanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        if let Some(form) = self.loaded_form.borrow_mut().take() {
            self.settings_form = form;
        }

        // Drain events from the session manager
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }
        if self.ui_state.needs_sync {
            self.sync_from_manager();
        }
        self.ui_state.dictating = self.speech.is_listening();

        if self.ui_state.is_busy() || self.ui_state.dictating {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("SMARTSAT")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Options")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Session list ─────────────────────────────────────
        SidePanel::left("sessions_panel")
            .exact_width(theme::SIDEBAR_WIDTH)
            .show(ctx, |ui| {
                let action = sessions::sessions_panel(ui, &self.ui_state);
                self.dispatch_sessions_action(action, ctx);
            });

        // ── Settings ─────────────────────────────────────────
        if self.ui_state.show_settings {
            SidePanel::right("settings_panel")
                .min_width(260.0)
                .max_width(340.0)
                .show(ctx, |ui| {
                    let feedback = self.save_feedback.borrow().clone();
                    let action =
                        settings::settings_panel(ui, &mut self.settings_form, feedback.as_ref());
                    match action {
                        SettingsAction::SaveClicked => self.save_settings(ctx),
                        SettingsAction::Changed => {
                            *self.save_feedback.borrow_mut() = None;
                        }
                        SettingsAction::None => {}
                    }
                });
        }

        // ── Chat ─────────────────────────────────────────────
        CentralPanel::default().show(ctx, |ui| {
            let action = chat::chat_panel(ui, &mut self.ui_state);
            self.dispatch_chat_action(action, ctx);
        });
    }
}

impl PanelApp {
    fn dispatch_sessions_action(&self, action: SessionsAction, ctx: &egui::Context) {
        let Some(services) = self.services() else {
            return;
        };
        let manager = services.manager;
        let ctx = ctx.clone();

        match action {
            SessionsAction::None => {}
            SessionsAction::New => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = manager.create_session().await {
                    log::error!("Create session failed: {}", e);
                }
                ctx.request_repaint();
            }),
            SessionsAction::Select(session_id) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = manager.select_session(&session_id).await {
                    log::error!("Select session failed: {}", e);
                }
                ctx.request_repaint();
            }),
            SessionsAction::Delete(session_id) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = manager.delete_session(&session_id).await {
                    log::error!("Delete session failed: {}", e);
                }
                ctx.request_repaint();
            }),
        }
    }

    fn dispatch_chat_action(&self, action: ChatAction, ctx: &egui::Context) {
        let Some(services) = self.services() else {
            return;
        };
        let manager = services.manager;

        match action {
            ChatAction::None => {}
            ChatAction::DraftEdited => manager.set_draft(self.ui_state.input_text.clone()),
            ChatAction::Submit(text) => {
                self.speech.stop();
                manager.set_draft(text);
                let ctx = ctx.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    match manager.submit_draft().await {
                        Ok(Some(outcome)) if !outcome.ok => {
                            log::warn!("Turn in {} ended with an error reply", outcome.session_id);
                        }
                        Ok(_) => {}
                        Err(e) => log::error!("Submit failed: {}", e),
                    }
                    ctx.request_repaint();
                });
            }
            ChatAction::ToggleDictation => self.toggle_dictation(manager, ctx),
        }
    }

    /// Start a dictation pass, or stop the running one
    fn toggle_dictation(&self, manager: Rc<SessionManager>, ctx: &egui::Context) {
        if self.speech.is_listening() {
            self.speech.stop();
            return;
        }

        // Dictation extends what is already typed
        manager.set_draft(self.ui_state.input_text.clone());
        let mut events = self.speech.start();
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(event) = events.next().await {
                manager.apply_speech(event);
                ctx.request_repaint();
            }
        });
    }

    /// Persist the settings form and flash the result
    fn save_settings(&self, ctx: &egui::Context) {
        let Some(services) = self.services() else {
            *self.save_feedback.borrow_mut() = Some(SaveFeedback::failed("storage is not ready"));
            return;
        };
        let config = self.settings_form.to_config();
        let feedback = self.save_feedback.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let result = services.config.save_relay_config(&config).await;
            let shown = match result {
                Ok(()) => SaveFeedback::saved(),
                Err(e) => {
                    log::error!("Saving relay settings failed: {}", e);
                    SaveFeedback::failed(e)
                }
            };
            *feedback.borrow_mut() = Some(shown.clone());
            ctx.request_repaint();

            TimeoutFuture::new(FEEDBACK_MS).await;
            let mut current = feedback.borrow_mut();
            if current.as_ref() == Some(&shown) {
                *current = None;
            }
            drop(current);
            ctx.request_repaint();
        });
    }
}
