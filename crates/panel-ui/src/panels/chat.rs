//! Chat panel — the active transcript and the composer.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use panel_types::message::Role;
use crate::state::{ChatEntry, UiState};
use crate::theme::*;

/// What the caller should do after rendering the chat panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    None,
    /// The composer text was edited by hand
    DraftEdited,
    /// Send the composer text
    Submit(String),
    /// Start or stop dictation
    ToggleDictation,
}

/// Render the chat panel.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState) -> ChatAction {
    let mut action = ChatAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("SMARTSAT").color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = if state.is_busy() { WARNING } else { SUCCESS };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                    });
                });

                ui.separator();

                let available_height = ui.available_height() - 60.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.active_session_id.is_none() {
                            ui.label(
                                RichText::new("Start a new chat or just type a message.")
                                    .color(TEXT_SECONDARY)
                                    .italics(),
                            );
                        }
                        for entry in &state.messages {
                            render_message(ui, entry);
                            ui.add_space(4.0);
                        }
                        if state.sending {
                            ui.label(RichText::new("…").color(ACCENT).strong());
                        }
                    });

                ui.add_space(8.0);

                // Composer
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Type a message...")
                        .desired_width(ui.available_width() - 110.0)
                        .font(egui::FontId::proportional(14.0));
                    let response = ui.add_enabled(!state.sending, input);
                    if response.changed() {
                        action = ChatAction::DraftEdited;
                    }

                    let mic_label = if state.dictating { "⏹" } else { "🎤" };
                    let mic = ui
                        .add_enabled(
                            state.speech_supported && !state.sending,
                            egui::Button::new(RichText::new(mic_label).color(TEXT_PRIMARY))
                                .fill(if state.dictating { ERROR } else { BG_SURFACE })
                                .corner_radius(PANEL_ROUNDING),
                        )
                        .on_disabled_hover_text(if state.speech_supported {
                            "Waiting for the reply"
                        } else {
                            "Speech recognition not supported in this browser"
                        });
                    if mic.clicked() {
                        action = ChatAction::ToggleDictation;
                    }

                    let send_enabled = state.can_submit();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    // Submit on Enter or button click
                    let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if send_enabled && (enter || send_btn.clicked()) {
                        action = ChatAction::Submit(state.input_text.trim().to_string());
                        state.input_text.clear();
                        response.request_focus();
                    }
                });
            });
        });

    action
}

fn render_message(ui: &mut egui::Ui, entry: &ChatEntry) {
    let (label, label_color, bg) = match (entry.role, entry.is_error) {
        (Role::User, _) => ("You", ACCENT, USER_BUBBLE),
        (Role::Assistant, false) => ("SMARTSAT", SUCCESS, ASSISTANT_BUBBLE),
        (Role::Assistant, true) => ("SMARTSAT", ERROR, ERROR_BG),
    };

    let layout = match entry.role {
        Role::User => Layout::top_down(Align::Max),
        Role::Assistant => Layout::top_down(Align::Min),
    };
    ui.with_layout(layout, |ui| {
        egui::Frame::default()
            .fill(bg)
            .corner_radius(PANEL_ROUNDING)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(label).color(label_color).strong().small());
                ui.label(RichText::new(&entry.content).color(TEXT_PRIMARY));
            });
    });
}
