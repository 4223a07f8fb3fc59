use std::path::PathBuf;

use ab_glyph::FontArc;
use anyhow::{Context as _, Result};
use bodymap::annotation::{require_valid_injuries, InjuryRecord};
use bodymap::flatten;
use bodymap::render::Surface;
use bodymap::session::BodyMapSession;
use bodymap::settings::Settings;
use bodymap::state::InjurySink;
use chrono::Local;
use eframe::egui::{
    self, ColorImage, Context as EguiContext, RichText, SidePanel, TextureOptions, TopBottomPanel,
};
use eframe::{App, Frame};
use image::RgbaImage;

use crate::action_bar;
use crate::canvas::{self, EguiSurface};
use crate::theme;
use crate::ui_controls;

/// The enclosing report form. Holds whatever the body map last reported.
#[derive(Debug, Default)]
pub struct ReportForm {
    pub injuries: Vec<InjuryRecord>,
}

impl InjurySink for ReportForm {
    fn injuries_changed(&mut self, injuries: &[InjuryRecord]) {
        self.injuries = injuries.to_vec();
    }
}

/// Seeding re-issues ids without notifying, so the form is filled from the
/// session rather than from the stored records.
fn sync_report_form<S: Surface>(session: &mut BodyMapSession<S, ReportForm>) {
    let injuries = session.injuries();
    session.sink_mut().injuries_changed(&injuries);
}

pub struct BodyMapApp {
    session: BodyMapSession<EguiSurface, ReportForm>,
    settings: Settings,
    theme: theme::AppTheme,
    background: RgbaImage,
    background_pending: bool,
    font: Option<FontArc>,
    export_feedback_until: Option<f64>,
    last_error: Option<String>,
}

impl BodyMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let theme = theme::clinical_light_theme();
        theme::apply_theme(&cc.egui_ctx, &theme);

        let settings = Settings::load().unwrap_or_else(|err| {
            tracing::info!(error = %format!("{err:#}"), "Using default settings");
            Settings::default()
        });
        let mut last_error = None;

        let atlas = settings.atlas().unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "Falling back to built-in atlas");
            last_error = Some(format!("{err:#}"));
            bodymap::RegionAtlas::body()
        });

        let viewport_width = cc
            .egui_ctx
            .input(|input| input.screen_rect().width());
        let size = settings.layout.surface_size(viewport_width);
        let surface = EguiSurface::new(cc.egui_ctx.clone(), size);
        let background = match Self::load_background(&settings, &atlas) {
            Ok(image) => image,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "Cannot prepare background");
                last_error = Some(format!("{err:#}"));
                RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))
            }
        };

        let records = settings.initial_injuries().unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "Cannot read stored injuries");
            last_error = Some(format!("{err:#}"));
            Vec::new()
        });
        let seeded = BodyMapSession::new(
            surface,
            atlas.clone(),
            settings.style.clone(),
            ReportForm::default(),
        )
        .with_initial_injuries(&records);
        let session = match seeded {
            Ok(mut session) => {
                sync_report_form(&mut session);
                session
            }
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring stored injuries");
                last_error = Some(err.to_string());
                BodyMapSession::new(
                    EguiSurface::new(cc.egui_ctx.clone(), size),
                    atlas,
                    settings.style.clone(),
                    ReportForm::default(),
                )
            }
        };

        let font = flatten::load_font(settings.font_path.as_deref());

        Self {
            session,
            settings,
            theme,
            background,
            background_pending: true,
            font,
            export_feedback_until: None,
            last_error,
        }
    }

    fn load_background(settings: &Settings, atlas: &bodymap::RegionAtlas) -> Result<RgbaImage> {
        match settings.background_path.as_deref() {
            Some(path) => flatten::load_background(path),
            None => flatten::placeholder_silhouette(atlas, settings.layout.wide),
        }
    }

    fn ensure_background(&mut self, ctx: &EguiContext) {
        if !self.background_pending {
            return;
        }
        self.background_pending = false;

        let size = [
            self.background.width() as usize,
            self.background.height() as usize,
        ];
        let color_image = ColorImage::from_rgba_unmultiplied(size, self.background.as_raw());
        let texture = ctx.load_texture("body-map-background", color_image, TextureOptions::LINEAR);
        self.session.background_loaded(texture);
    }

    fn sync_surface_size(&mut self, viewport_width: f32) {
        let wanted = self.settings.layout.surface_size(viewport_width);
        if let Err(err) = self.session.resize(wanted) {
            tracing::warn!(error = %err, "Rejected surface size");
        }
    }

    fn export_png(&mut self) -> Result<PathBuf> {
        let dir = self
            .settings
            .export_dir()
            .context("no export directory available")?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;

        let name = format!("Body map {}.png", Local::now().format("%Y-%m-%d at %H.%M.%S"));
        let path = dir.join(name);

        let flattened = flatten::flatten(
            &self.background,
            self.session.annotations(),
            self.session.surface().size(),
            self.session.style(),
            self.font.clone(),
        )
        .context("flatten failed")?;
        let png = flatten::encode_png(&flattened)?;
        std::fs::write(&path, png)
            .with_context(|| format!("cannot save png to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Exported body map");
        Ok(path)
    }

    fn show_report(&self, ui: &mut egui::Ui) {
        let form = self.session.sink();
        ui.heading("Injuries");
        ui.add_space(self.theme.layout.space_2);

        ui_controls::card_frame(&self.theme).show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            if form.injuries.is_empty() {
                ui.label(
                    RichText::new("Draw around an injury on the body map.")
                        .color(self.theme.text.muted),
                );
            }
            for (index, record) in form.injuries.iter().enumerate() {
                let color = if record.is_valid() {
                    self.theme.text.primary
                } else {
                    self.theme.text.warning
                };
                ui.label(RichText::new(format!("{}. {}", index + 1, record.body_part)).color(color));
            }
        });

        ui.add_space(self.theme.layout.space_3);
        match require_valid_injuries(&form.injuries) {
            Ok(valid) => ui_controls::status_badge(
                ui,
                &format!("{} valid for submission", valid.len()),
                self.theme.surfaces.accent,
            ),
            Err(err) => ui_controls::status_badge(ui, &err.to_string(), self.theme.surfaces.danger),
        }

        if let Some(message) = self.last_error.as_deref() {
            ui.add_space(self.theme.layout.space_3);
            ui.label(RichText::new(message).size(12.0).color(self.theme.text.warning));
        }
    }
}

impl App for BodyMapApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.ensure_background(ctx);
        self.sync_surface_size(ctx.input(|input| input.screen_rect().width()));

        let exported_feedback = self
            .export_feedback_until
            .is_some_and(|deadline| ctx.input(|input| input.time) <= deadline);
        let width_class = self
            .settings
            .layout
            .width_class(ctx.input(|input| input.screen_rect().width()));
        let injury_count = self.session.annotations().len();

        let action_output = TopBottomPanel::bottom("action_bar")
            .exact_height(self.theme.layout.action_bar_height)
            .frame(ui_controls::action_bar_frame(&self.theme))
            .show(ctx, |ui| {
                action_bar::show_action_bar(
                    ui,
                    &self.theme,
                    injury_count,
                    exported_feedback,
                    width_class,
                )
            })
            .inner;

        SidePanel::right("report")
            .exact_width(self.theme.layout.side_panel_width)
            .resizable(false)
            .frame(ui_controls::side_panel_frame(&self.theme))
            .show(ctx, |ui| self.show_report(ui));

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surfaces.app_bg)
                    .inner_margin(egui::Margin::symmetric(
                        self.theme.layout.panel_padding_x,
                        self.theme.layout.panel_padding_y + 2.0,
                    )),
            )
            .show(ctx, |ui| {
                canvas::show_canvas(ui, ctx, &self.theme, &mut self.session);
            });

        if action_output.undo {
            self.session.undo();
        }
        if action_output.clear {
            self.session.clear();
        }
        if action_output.export {
            match self.export_png() {
                Ok(_) => {
                    self.last_error = None;
                    self.export_feedback_until = Some(ctx.input(|input| input.time) + 1.5);
                }
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "Export failed");
                    self.last_error = Some(format!("Export failed: {err:#}"));
                }
            }
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.abandon_stroke();
        if let Err(err) = self.settings.save() {
            tracing::warn!(error = %format!("{err:#}"), "Cannot save settings");
        }
    }
}
