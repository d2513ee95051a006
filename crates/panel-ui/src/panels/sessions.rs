//! Session sidebar — one row per chat, newest last, plus "New chat".

use egui::{self, RichText, ScrollArea, Vec2};
use crate::state::UiState;
use crate::theme::*;

/// What the user asked for in the sidebar this frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionsAction {
    None,
    New,
    Select(String),
    Delete(String),
}

pub fn sessions_panel(ui: &mut egui::Ui, state: &UiState) -> SessionsAction {
    let mut action = SessionsAction::None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            let new_btn = ui.add(
                egui::Button::new(RichText::new("+ New chat").color(TEXT_PRIMARY).strong())
                    .fill(ACCENT)
                    .corner_radius(PANEL_ROUNDING)
                    .min_size(Vec2::new(ui.available_width(), 28.0)),
            );
            if new_btn.clicked() {
                action = SessionsAction::New;
            }

            ui.add_space(6.0);

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if state.sessions.is_empty() {
                        ui.label(
                            RichText::new("No chats yet")
                                .color(TEXT_SECONDARY)
                                .small()
                                .italics(),
                        );
                    }
                    for session in &state.sessions {
                        let active = state.is_active(&session.id);
                        ui.horizontal(|ui| {
                            let title = RichText::new(&session.title).color(if active {
                                TEXT_PRIMARY
                            } else {
                                TEXT_SECONDARY
                            });
                            let row = ui
                                .selectable_label(active, title)
                                .on_hover_text(format!("{} messages", session.message_count));
                            if row.clicked() && !active {
                                action = SessionsAction::Select(session.id.clone());
                            }
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                let delete = ui
                                    .small_button(RichText::new("×").color(ERROR))
                                    .on_hover_text("Delete chat");
                                if delete.clicked() {
                                    action = SessionsAction::Delete(session.id.clone());
                                }
                            });
                        });
                    }
                });
        });

    action
}
