use bodymap::geometry::{DevicePoint, DisplayRect, SurfaceSize};
use bodymap::render::{Rgba, Surface};
use bodymap::session::{BodyMapSession, PointerEvent, PointerSource};
use bodymap::state::InjurySink;
use egui::{
    pos2, vec2, Align2, Color32, Context, FontId, Pos2, Rect, Response, Sense, Shape, Stroke,
    TextureHandle, Ui,
};

use crate::theme::AppTheme;

/// Retained shape list standing in for a canvas backing store. The session
/// repaints it on change; the host replays it every frame.
pub struct EguiSurface {
    ctx: Context,
    size: SurfaceSize,
    shapes: Vec<Shape>,
}

impl EguiSurface {
    pub fn new(ctx: Context, size: SurfaceSize) -> Self {
        Self {
            ctx,
            size,
            shapes: Vec::new(),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

fn color(rgba: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn to_pos(point: DevicePoint) -> Pos2 {
    pos2(point.x, point.y)
}

impl Surface for EguiSurface {
    type Image = TextureHandle;

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.shapes.clear();
    }

    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn draw_image_scaled(&mut self, image: &TextureHandle, x: f32, y: f32, width: f32, height: f32) {
        self.shapes.push(Shape::image(
            image.id(),
            Rect::from_min_size(pos2(x, y), vec2(width, height)),
            Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
            Color32::WHITE,
        ));
    }

    fn stroke_path(&mut self, points: &[DevicePoint], closed: bool, rgba: Rgba, width: f32) {
        let points: Vec<Pos2> = points.iter().copied().map(to_pos).collect();
        let stroke = Stroke::new(width, color(rgba));
        self.shapes.push(if closed {
            Shape::closed_line(points, stroke)
        } else {
            Shape::line(points, stroke)
        });
    }

    fn fill_circle(&mut self, center: DevicePoint, radius: f32, rgba: Rgba) {
        self.shapes
            .push(Shape::circle_filled(to_pos(center), radius, color(rgba)));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, rgba: Rgba) {
        self.shapes.push(Shape::rect_filled(
            Rect::from_min_size(pos2(x, y), vec2(width, height)),
            0.0,
            color(rgba),
        ));
    }

    fn fill_text(&mut self, text: &str, center: DevicePoint, font_size: f32, rgba: Rgba) {
        let shape = self.ctx.fonts(|fonts| {
            Shape::text(
                fonts,
                to_pos(center),
                Align2::CENTER_CENTER,
                text,
                FontId::proportional(font_size),
                color(rgba),
            )
        });
        self.shapes.push(shape);
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(
                    text.to_string(),
                    FontId::proportional(font_size),
                    Color32::WHITE,
                )
                .size()
                .x
        })
    }
}

pub fn show_canvas<K: InjurySink>(
    ui: &mut Ui,
    ctx: &Context,
    theme: &AppTheme,
    session: &mut BodyMapSession<EguiSurface, K>,
) {
    let size = session.surface().size();
    let available = ui.available_rect_before_wrap();
    let origin = pos2(
        available.center().x - size.width * 0.5,
        (available.center().y - size.height * 0.5).max(available.top()),
    );
    let canvas_rect = Rect::from_min_size(origin, vec2(size.width, size.height));
    let response = ui.allocate_rect(canvas_rect, Sense::drag());

    let painter = ui.painter_at(available);
    painter.rect_filled(canvas_rect.expand(10.0), 12.0, theme.surfaces.canvas_bg);
    painter.rect_stroke(
        canvas_rect.expand(10.0),
        12.0,
        Stroke::new(1.0, theme.surfaces.stroke_soft),
    );

    if !session.is_ready() {
        painter.text(
            canvas_rect.center(),
            Align2::CENTER_CENTER,
            "Loading body map…",
            FontId::proportional(16.0),
            theme.text.muted,
        );
        return;
    }

    let display = DisplayRect::new(
        canvas_rect.left(),
        canvas_rect.top(),
        canvas_rect.width(),
        canvas_rect.height(),
    );
    session.set_display_rect(display);
    handle_pointer_interaction(ctx, session, &response, display);

    let offset = canvas_rect.min.to_vec2();
    painter.extend(session.surface().shapes().iter().cloned().map(|mut shape| {
        shape.translate(offset);
        shape
    }));
}

fn handle_pointer_interaction<K: InjurySink>(
    ctx: &Context,
    session: &mut BodyMapSession<EguiSurface, K>,
    response: &Response,
    display: DisplayRect,
) {
    let source = if ctx.input(|input| input.any_touches()) {
        PointerSource::Touch
    } else {
        PointerSource::Mouse
    };

    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            session.handle_pointer(PointerEvent::Down {
                x: pos.x,
                y: pos.y,
                source,
            });
        }
    }

    if response.dragged() && response.drag_delta() != egui::Vec2::ZERO {
        if let Some(pos) = response.interact_pointer_pos() {
            let event = if display.contains(pos.x, pos.y) {
                PointerEvent::Move {
                    x: pos.x,
                    y: pos.y,
                    source,
                }
            } else {
                PointerEvent::Leave
            };
            if session.is_drawing() {
                session.handle_pointer(event);
            }
        }
    }

    if response.drag_stopped() && session.is_drawing() {
        session.handle_pointer(PointerEvent::Up);
    }
}
