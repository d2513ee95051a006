//! Side panel palette and egui style

use egui::{Color32, CornerRadius, Stroke, Vec2};

pub const BG_PRIMARY: Color32 = Color32::from_rgb(17, 24, 39);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(31, 41, 55);
pub const BG_SURFACE: Color32 = Color32::from_rgb(55, 65, 81);
pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(243, 244, 246);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(156, 163, 175);
pub const ACCENT: Color32 = Color32::from_rgb(14, 165, 233);
pub const SUCCESS: Color32 = Color32::from_rgb(52, 211, 153);
pub const ERROR: Color32 = Color32::from_rgb(248, 113, 113);
pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36);

/// Bubble fills
pub const USER_BUBBLE: Color32 = Color32::from_rgb(12, 74, 110);
pub const ASSISTANT_BUBBLE: Color32 = BG_SECONDARY;
pub const ERROR_BG: Color32 = Color32::from_rgb(69, 26, 26);
pub const INPUT_BG: Color32 = Color32::from_rgb(11, 15, 25);

/// Fixed width of the session list
pub const SIDEBAR_WIDTH: f32 = 200.0;

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(8);
pub const PANEL_PADDING: Vec2 = Vec2::new(10.0, 8.0);

/// Install the panel style on an egui context
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    let visuals = &mut style.visuals;

    visuals.dark_mode = true;
    visuals.panel_fill = BG_PRIMARY;
    visuals.window_fill = BG_SECONDARY;
    visuals.extreme_bg_color = INPUT_BG;

    for (widget, bg, fg) in [
        (&mut visuals.widgets.inactive, BG_SURFACE, TEXT_SECONDARY),
        (&mut visuals.widgets.hovered, BG_SURFACE, TEXT_PRIMARY),
        (&mut visuals.widgets.active, ACCENT, TEXT_PRIMARY),
    ] {
        widget.bg_fill = bg;
        widget.weak_bg_fill = bg;
        widget.fg_stroke = Stroke::new(1.0, fg);
    }

    visuals.selection.bg_fill = ACCENT.linear_multiply(0.35);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    style.spacing.item_spacing = Vec2::new(6.0, 6.0);
    ctx.set_style(style);
}
