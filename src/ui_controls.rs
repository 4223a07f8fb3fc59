use egui::{Color32, Frame, Margin, RichText, Rounding, Stroke, Ui, Vec2};

use crate::theme::AppTheme;

pub fn card_frame(theme: &AppTheme) -> Frame {
    Frame::none()
        .fill(theme.surfaces.card_bg)
        .rounding(Rounding::same(theme.controls.card_rounding))
        .stroke(Stroke::new(1.0, theme.surfaces.stroke_soft))
        .inner_margin(Margin::symmetric(
            theme.layout.space_4,
            theme.layout.space_3,
        ))
}

pub fn side_panel_frame(theme: &AppTheme) -> Frame {
    Frame::none()
        .fill(theme.surfaces.panel_bg)
        .rounding(Rounding::ZERO)
        .inner_margin(Margin::symmetric(
            theme.layout.panel_padding_x,
            theme.layout.panel_padding_y,
        ))
}

pub fn action_bar_frame(theme: &AppTheme) -> Frame {
    let vertical_padding = ((theme.layout.action_bar_height - theme.controls.action_height) * 0.5)
        .round()
        .max(theme.layout.space_1);

    Frame::none()
        .fill(theme.surfaces.panel_bg)
        .rounding(Rounding::ZERO)
        .inner_margin(Margin::symmetric(
            theme.layout.panel_padding_x,
            vertical_padding,
        ))
}

pub fn primary_button(
    ui: &mut Ui,
    theme: &AppTheme,
    label: &str,
    min_size: Vec2,
) -> egui::Response {
    ui.add(
        egui::Button::new(RichText::new(label).strong().color(theme.text.accent))
            .min_size(min_size)
            .fill(theme.surfaces.accent_soft)
            .stroke(Stroke::new(1.0, theme.surfaces.accent))
            .rounding(Rounding::same(theme.controls.button_rounding)),
    )
}

pub fn ghost_button(ui: &mut Ui, theme: &AppTheme, label: &str, min_size: Vec2) -> egui::Response {
    ui.add(
        egui::Button::new(RichText::new(label).color(theme.text.secondary))
            .min_size(min_size)
            .fill(theme.surfaces.card_bg_alt)
            .stroke(Stroke::new(1.0, theme.surfaces.stroke_soft))
            .rounding(Rounding::same(theme.controls.button_rounding)),
    )
}

pub fn status_badge(ui: &mut Ui, text: &str, color: Color32) {
    Frame::none()
        .fill(Color32::from_rgba_unmultiplied(
            color.r(),
            color.g(),
            color.b(),
            28,
        ))
        .rounding(Rounding::same(10.0))
        .stroke(Stroke::new(1.0, color))
        .inner_margin(Margin::symmetric(8.0, 4.0))
        .show(ui, |ui| {
            ui.label(RichText::new(text).size(12.0).color(color).strong());
        });
}
