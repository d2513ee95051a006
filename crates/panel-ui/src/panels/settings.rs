//! Settings panel — relay endpoint URL, API key and model, with an explicit
//! Save button and visual feedback.

use egui::{self, RichText, Vec2};
use panel_types::config::DEFAULT_MODEL;
use crate::state::SettingsForm;
use crate::theme::*;

/// What the caller should do after rendering the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A field was edited
    Changed,
    /// The user clicked Save
    SaveClicked,
}

/// Save feedback passed in from the app layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

impl SaveFeedback {
    pub fn saved() -> Self {
        Self {
            message: "Saved".to_string(),
            success: true,
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            message: format!("Save failed: {}", reason),
            success: false,
        }
    }
}

/// Render the settings panel. Returns an action for the caller to handle.
pub fn settings_panel(
    ui: &mut egui::Ui,
    form: &mut SettingsForm,
    save_feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let mut changed = false;
    let mut save_clicked = false;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Options").color(TEXT_PRIMARY));
            ui.separator();

            ui.label(RichText::new("Assistant endpoint").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("API URL").color(TEXT_SECONDARY).small());
            let url_edit = egui::TextEdit::singleline(&mut form.endpoint_url)
                .hint_text("https://example.com/api/chat");
            if ui.add(url_edit).changed() {
                changed = true;
            }

            ui.add_space(4.0);

            // API Key (masked)
            ui.label(RichText::new("API Key (optional)").color(TEXT_SECONDARY).small());
            let api_key_edit = egui::TextEdit::singleline(&mut form.api_key).password(true);
            if ui.add(api_key_edit).changed() {
                changed = true;
            }

            ui.add_space(4.0);

            ui.label(RichText::new("Model (optional)").color(TEXT_SECONDARY).small());
            let model_edit = egui::TextEdit::singleline(&mut form.model).hint_text(DEFAULT_MODEL);
            if ui.add(model_edit).changed() {
                changed = true;
            }

            if form.endpoint_url.trim().is_empty() {
                ui.add_space(4.0);
                ui.label(
                    RichText::new("Messages cannot be sent until an API URL is set.")
                        .color(WARNING)
                        .small()
                        .italics(),
                );
            }

            ui.add_space(16.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let btn = ui.add(
                    egui::Button::new(RichText::new("Save").color(TEXT_PRIMARY).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    save_clicked = true;
                }

                if let Some(fb) = save_feedback {
                    let color = if fb.success { SUCCESS } else { ERROR };
                    ui.label(RichText::new(&fb.message).color(color).small());
                }
            });
        });

    if save_clicked {
        SettingsAction::SaveClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}
