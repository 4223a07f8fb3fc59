use bodymap::settings::WidthClass;
use egui::{vec2, Align, Layout, Ui};

use crate::theme::AppTheme;
use crate::ui_controls;

pub struct ActionBarOutput {
    pub undo: bool,
    pub clear: bool,
    pub export: bool,
}

pub fn should_show_count_label(width_class: WidthClass, available_width: f32) -> bool {
    match width_class {
        WidthClass::Compact => available_width >= 160.0,
        WidthClass::Regular | WidthClass::Wide => true,
    }
}

pub fn show_action_bar(
    ui: &mut Ui,
    theme: &AppTheme,
    injury_count: usize,
    exported_feedback: bool,
    width_class: WidthClass,
) -> ActionBarOutput {
    let action_h = theme.controls.action_height;
    let button_gap = theme.layout.space_3;
    let button_w = if width_class == WidthClass::Compact {
        76.0
    } else {
        96.0
    };
    let export_w = if width_class == WidthClass::Compact {
        92.0
    } else {
        116.0
    };
    let buttons_w = button_w * 2.0 + export_w + button_gap * 2.0;
    let count_visible = should_show_count_label(width_class, ui.available_width() - buttons_w);
    let has_injuries = injury_count > 0;

    let mut out = ActionBarOutput {
        undo: false,
        clear: false,
        export: false,
    };

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing = vec2(button_gap, 0.0);

        let undo_button = ui.add_enabled_ui(has_injuries, |ui| {
            ui_controls::ghost_button(ui, theme, "↩ Undo", vec2(button_w, action_h))
        });
        if undo_button.inner.clicked() {
            out.undo = true;
        }

        let clear_button = ui.add_enabled_ui(has_injuries, |ui| {
            ui_controls::ghost_button(ui, theme, "Clear", vec2(button_w, action_h))
        });
        if clear_button.inner.clicked() {
            out.clear = true;
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let label = if exported_feedback {
                "Exported"
            } else {
                "Export PNG"
            };
            if ui_controls::primary_button(ui, theme, label, vec2(export_w, action_h)).clicked() {
                out.export = true;
            }

            if count_visible {
                ui.add_space(theme.layout.space_2);
                let text = match injury_count {
                    1 => "1 injury".to_string(),
                    count => format!("{count} injuries"),
                };
                ui.label(egui::RichText::new(text).color(theme.text.muted));
            }
        });
    });

    out
}
