//! Immediate-mode drawing contract and the full-surface redraw.
//!
//! Everything passed to a [`Surface`] is in device coordinates of that
//! surface. Annotations are denormalized against the surface size right
//! before drawing and never written back.

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::geometry::{denormalize, DevicePoint, SurfaceSize};

pub type Rgba = [u8; 4];

pub trait Surface {
    type Image;

    fn size(&self) -> SurfaceSize;

    /// Changes the backing store size. Callers only pass valid sizes.
    fn resize(&mut self, size: SurfaceSize);

    fn clear(&mut self);

    fn draw_image_scaled(&mut self, image: &Self::Image, x: f32, y: f32, width: f32, height: f32);

    fn stroke_path(&mut self, points: &[DevicePoint], closed: bool, color: Rgba, width: f32);

    fn fill_circle(&mut self, center: DevicePoint, radius: f32, color: Rgba);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    /// Draws `text` centered horizontally and vertically on `center`.
    fn fill_text(&mut self, text: &str, center: DevicePoint, font_size: f32, color: Rgba);

    fn measure_text(&self, text: &str, font_size: f32) -> f32;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderStyle {
    pub stroke_color: Rgba,
    pub stroke_width: f32,
    pub marker_radius: f32,
    pub label_color: Rgba,
    pub label_background: Rgba,
    pub label_font_size: f32,
    pub label_padding: f32,
    pub label_height: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            stroke_color: [255, 0, 0, 255],
            stroke_width: 1.0,
            marker_radius: 5.0,
            label_color: [255, 0, 0, 255],
            label_background: [255, 255, 255, 204],
            label_font_size: 12.0,
            label_padding: 10.0,
            label_height: 20.0,
        }
    }
}

/// Clears the surface and paints background, every annotation in list
/// order, then the live stroke if one is being drawn.
pub fn redraw<S: Surface>(
    surface: &mut S,
    background: &S::Image,
    annotations: &[Annotation],
    live_stroke: Option<&[DevicePoint]>,
    style: &RenderStyle,
) {
    let size = surface.size();
    surface.clear();
    surface.draw_image_scaled(background, 0.0, 0.0, size.width, size.height);

    for annotation in annotations {
        draw_annotation(surface, annotation, size, style);
    }

    if let Some(points) = live_stroke {
        if !points.is_empty() {
            surface.stroke_path(points, false, style.stroke_color, style.stroke_width);
        }
    }
}

fn draw_annotation<S: Surface>(
    surface: &mut S,
    annotation: &Annotation,
    size: SurfaceSize,
    style: &RenderStyle,
) {
    let anchor = denormalize(annotation.location, size);

    match annotation.path.as_deref() {
        Some(path) if !path.is_empty() => {
            let points: Vec<DevicePoint> =
                path.iter().map(|point| denormalize(*point, size)).collect();
            surface.stroke_path(&points, true, style.stroke_color, style.stroke_width);
            draw_label(surface, &annotation.body_part, anchor, style);
        }
        _ => {
            surface.fill_circle(anchor, style.marker_radius, style.stroke_color);
            let above = DevicePoint::new(anchor.x, anchor.y - style.label_height / 2.0);
            draw_label(surface, &annotation.body_part, above, style);
        }
    }
}

fn draw_label<S: Surface>(surface: &mut S, text: &str, center: DevicePoint, style: &RenderStyle) {
    let width = surface.measure_text(text, style.label_font_size) + style.label_padding;
    surface.fill_rect(
        center.x - width / 2.0,
        center.y - style.label_height / 2.0,
        width,
        style.label_height,
        style.label_background,
    );
    surface.fill_text(text, center, style.label_font_size, style.label_color);
}
