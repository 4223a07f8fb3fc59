use egui::epaint::Shadow;
use egui::{vec2, Color32, Context, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

#[derive(Clone, Debug)]
pub struct AppTheme {
    pub surfaces: SurfaceTokens,
    pub text: TextTokens,
    pub controls: ControlTokens,
    pub layout: LayoutTokens,
    pub shadows: ShadowTokens,
}

#[derive(Clone, Debug)]
pub struct SurfaceTokens {
    pub app_bg: Color32,
    pub panel_bg: Color32,
    pub card_bg: Color32,
    pub card_bg_alt: Color32,
    pub canvas_bg: Color32,
    pub stroke_soft: Color32,
    pub stroke_strong: Color32,
    pub accent: Color32,
    pub accent_soft: Color32,
    pub danger: Color32,
}

#[derive(Clone, Debug)]
pub struct TextTokens {
    pub primary: Color32,
    pub secondary: Color32,
    pub muted: Color32,
    pub accent: Color32,
    pub warning: Color32,
}

#[derive(Clone, Debug)]
pub struct ControlTokens {
    pub card_rounding: f32,
    pub panel_rounding: f32,
    pub button_rounding: f32,
    pub action_height: f32,
}

#[derive(Clone, Debug)]
pub struct LayoutTokens {
    pub space_1: f32,
    pub space_2: f32,
    pub space_3: f32,
    pub space_4: f32,
    pub panel_padding_x: f32,
    pub panel_padding_y: f32,
    pub control_gap: f32,
    pub action_bar_height: f32,
    pub side_panel_width: f32,
}

#[derive(Clone, Debug)]
pub struct ShadowTokens {
    pub ambient: Color32,
    pub elevation: Color32,
}

pub fn clinical_light_theme() -> AppTheme {
    AppTheme {
        surfaces: SurfaceTokens {
            app_bg: Color32::from_rgb(0xF2, 0xF4, 0xF7),
            panel_bg: Color32::from_rgb(0xFA, 0xFB, 0xFC),
            card_bg: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            card_bg_alt: Color32::from_rgb(0xF6, 0xF7, 0xF9),
            canvas_bg: Color32::from_rgb(0xE9, 0xEC, 0xF1),
            stroke_soft: Color32::from_rgba_unmultiplied(15, 23, 42, 28),
            stroke_strong: Color32::from_rgba_unmultiplied(15, 23, 42, 60),
            accent: Color32::from_rgb(0x25, 0x63, 0xEB),
            accent_soft: Color32::from_rgba_unmultiplied(37, 99, 235, 46),
            danger: Color32::from_rgb(0xDC, 0x26, 0x26),
        },
        text: TextTokens {
            primary: Color32::from_rgb(0x11, 0x18, 0x27),
            secondary: Color32::from_rgb(0x37, 0x41, 0x51),
            muted: Color32::from_rgb(0x6B, 0x72, 0x80),
            accent: Color32::from_rgb(0x1D, 0x4E, 0xD8),
            warning: Color32::from_rgb(0xB4, 0x53, 0x09),
        },
        controls: ControlTokens {
            card_rounding: 10.0,
            panel_rounding: 8.0,
            button_rounding: 6.0,
            action_height: 30.0,
        },
        layout: LayoutTokens {
            space_1: 4.0,
            space_2: 8.0,
            space_3: 12.0,
            space_4: 16.0,
            panel_padding_x: 12.0,
            panel_padding_y: 8.0,
            control_gap: 8.0,
            action_bar_height: 50.0,
            side_panel_width: 260.0,
        },
        shadows: ShadowTokens {
            ambient: Color32::from_rgba_unmultiplied(0, 0, 0, 24),
            elevation: Color32::from_rgba_unmultiplied(0, 0, 0, 48),
        },
    }
}

pub fn apply_theme(ctx: &Context, theme: &AppTheme) {
    let mut style: Style = (*ctx.style()).clone();

    style.spacing.item_spacing = vec2(theme.layout.control_gap, theme.layout.space_2);
    style.spacing.button_padding = vec2(theme.layout.space_3, theme.layout.space_1);
    style.spacing.window_margin =
        egui::Margin::symmetric(theme.layout.space_3, theme.layout.space_3);

    style.visuals = Visuals::light();
    style.visuals.override_text_color = Some(theme.text.primary);
    style.visuals.panel_fill = theme.surfaces.panel_bg;
    style.visuals.window_fill = theme.surfaces.card_bg;
    style.visuals.extreme_bg_color = theme.surfaces.app_bg;
    style.visuals.window_rounding = Rounding::same(theme.controls.panel_rounding);

    style.visuals.widgets.inactive.bg_fill = theme.surfaces.card_bg_alt;
    style.visuals.widgets.inactive.weak_bg_fill = theme.surfaces.card_bg_alt;
    style.visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, theme.surfaces.stroke_soft);
    style.visuals.widgets.hovered.bg_fill = theme.surfaces.card_bg;
    style.visuals.widgets.hovered.weak_bg_fill = theme.surfaces.card_bg;
    style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, theme.surfaces.stroke_strong);
    style.visuals.widgets.active.bg_fill = theme.surfaces.accent_soft;
    style.visuals.widgets.active.bg_stroke = Stroke::new(1.0, theme.surfaces.accent);

    style.visuals.selection.bg_fill = theme.surfaces.accent_soft;
    style.visuals.selection.stroke = Stroke::new(1.0, theme.surfaces.accent);
    style.visuals.window_shadow = Shadow {
        offset: vec2(0.0, 8.0),
        blur: 20.0,
        spread: 0.0,
        color: theme.shadows.elevation,
    };
    style.visuals.popup_shadow = Shadow {
        offset: vec2(0.0, 6.0),
        blur: 16.0,
        spread: 0.0,
        color: theme.shadows.ambient,
    };

    for widgets in [
        &mut style.visuals.widgets.noninteractive,
        &mut style.visuals.widgets.inactive,
        &mut style.visuals.widgets.hovered,
        &mut style.visuals.widgets.active,
        &mut style.visuals.widgets.open,
    ] {
        widgets.rounding = Rounding::same(theme.controls.button_rounding);
    }

    style.text_styles.insert(
        TextStyle::Heading,
        FontId::new(22.0, FontFamily::Proportional),
    );
    style
        .text_styles
        .insert(TextStyle::Body, FontId::new(15.0, FontFamily::Proportional));
    style.text_styles.insert(
        TextStyle::Button,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        TextStyle::Small,
        FontId::new(12.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}
