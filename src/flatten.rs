use std::path::Path;

use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tiny_skia::{
    BlendMode, Color, FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

use crate::annotation::Annotation;
use crate::atlas::RegionAtlas;
use crate::geometry::{DevicePoint, SurfaceSize};
use crate::render::{self, RenderStyle, Rgba as Color8, Surface};

const SILHOUETTE_FILL: Color8 = [226, 229, 236, 255];
const SILHOUETTE_EDGE: Color8 = [168, 174, 186, 255];

/// CPU raster surface backed by a tiny-skia pixmap. Labels are queued and
/// drawn with imageproc onto the demultiplied output in [`Self::to_image`].
pub struct RasterSurface {
    pixmap: Pixmap,
    size: SurfaceSize,
    font: Option<FontArc>,
    labels: Vec<QueuedLabel>,
}

#[derive(Clone, Debug, PartialEq)]
struct QueuedLabel {
    text: String,
    center: DevicePoint,
    font_size: f32,
    color: Color8,
}

impl RasterSurface {
    pub fn new(size: SurfaceSize) -> Result<Self> {
        let (width, height) = pixel_dims(size);
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate {width}x{height} pixmap"))?;
        Ok(Self {
            pixmap,
            size,
            font: None,
            labels: Vec::new(),
        })
    }

    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn to_image(&self) -> RgbaImage {
        let mut output = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in output.pixels_mut().zip(self.pixmap.pixels()) {
            let color = src.demultiply();
            *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        self.draw_labels(&mut output);
        output
    }

    fn draw_labels(&self, image: &mut RgbaImage) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        for label in &self.labels {
            let (text_w, text_h) = text_size(label.font_size, font, &label.text);
            let left = (label.center.x - text_w as f32 / 2.0).round() as i32;
            let top = (label.center.y - text_h as f32 / 2.0).round() as i32;
            draw_text_mut(
                image,
                Rgba(label.color),
                left,
                top,
                label.font_size,
                font,
                &label.text,
            );
        }
    }

    fn paint(color: Color8) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        paint
    }
}

impl Surface for RasterSurface {
    type Image = RgbaImage;

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        let (width, height) = pixel_dims(size);
        match Pixmap::new(width, height) {
            Some(pixmap) => {
                self.pixmap = pixmap;
                self.size = size;
                self.labels.clear();
            }
            None => tracing::warn!(width, height, "Cannot allocate resized pixmap"),
        }
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
        self.labels.clear();
    }

    fn draw_image_scaled(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32) {
        let (width, height) = pixel_dims(SurfaceSize::new(width, height));
        let mut scaled = imageops::resize(image, width, height, FilterType::Triangle).into_raw();
        premultiply(&mut scaled);

        let Some(size) = IntSize::from_wh(width, height) else {
            return;
        };
        let Some(source) = Pixmap::from_vec(scaled, size) else {
            return;
        };
        self.pixmap.draw_pixmap(
            x.round() as i32,
            y.round() as i32,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    fn stroke_path(&mut self, points: &[DevicePoint], closed: bool, color: Color8, width: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for point in rest {
            pb.line_to(point.x, point.y);
        }
        if closed {
            pb.close();
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            ..Default::default()
        };
        self.pixmap.stroke_path(
            &path,
            &Self::paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn fill_circle(&mut self, center: DevicePoint, radius: f32, color: Color8) {
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &Self::paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color8) {
        let Some(rect) = Rect::from_xywh(x, y, width, height) else {
            return;
        };
        let mut paint = Self::paint(color);
        if color[3] == 0 {
            paint.blend_mode = BlendMode::Clear;
        }
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn fill_text(&mut self, text: &str, center: DevicePoint, font_size: f32, color: Color8) {
        self.labels.push(QueuedLabel {
            text: text.to_string(),
            center,
            font_size,
            color,
        });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        match self.font.as_ref() {
            Some(font) => text_size(font_size, font, text).0 as f32,
            None => text.chars().count() as f32 * font_size * 0.55,
        }
    }
}

/// Renders the background and every annotation at `size` into one image.
pub fn flatten(
    background: &RgbaImage,
    annotations: &[Annotation],
    size: SurfaceSize,
    style: &RenderStyle,
    font: Option<FontArc>,
) -> Result<DynamicImage> {
    let size = size.validate().context("cannot flatten onto this surface")?;
    let mut surface = RasterSurface::new(size)?.with_font(font);
    render::redraw(&mut surface, background, annotations, None, style);
    Ok(DynamicImage::ImageRgba8(surface.to_image()))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode PNG")?;
    Ok(buffer.into_inner())
}

/// Stand-in background drawn from the atlas rectangles, used when no
/// silhouette asset is configured.
pub fn placeholder_silhouette(atlas: &RegionAtlas, size: SurfaceSize) -> Result<RgbaImage> {
    let size = size.validate().context("cannot draw silhouette")?;
    let mut surface = RasterSurface::new(size)?;
    surface.pixmap.fill(Color::WHITE);

    let reference = atlas.reference();
    let scale_x = size.width / reference.width;
    let scale_y = size.height / reference.height;
    for region in atlas.regions() {
        let x = region.x[0] * scale_x;
        let y = region.y[0] * scale_y;
        let width = (region.x[1] - region.x[0]) * scale_x;
        let height = (region.y[1] - region.y[0]) * scale_y;
        surface.fill_rect(x, y, width, height, SILHOUETTE_FILL);
        let outline = [
            DevicePoint::new(x, y),
            DevicePoint::new(x + width, y),
            DevicePoint::new(x + width, y + height),
            DevicePoint::new(x, y + height),
        ];
        surface.stroke_path(&outline, true, SILHOUETTE_EDGE, 1.0);
    }

    Ok(surface.to_image())
}

pub fn load_background(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("cannot open background {}", path.display()))?;
    Ok(image.to_rgba8())
}

pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    let candidates = [
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Helvetica.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    let configured = configured.into_iter().map(Path::to_path_buf);
    let system = candidates.iter().map(|path| Path::new(path).to_path_buf());
    for path in configured.chain(system) {
        if let Ok(bytes) = std::fs::read(&path) {
            match FontArc::try_from_vec(bytes) {
                Ok(font) => return Some(font),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "Unusable font"),
            }
        }
    }

    tracing::warn!("No label font found, labels will be drawn without text");
    None
}

fn pixel_dims(size: SurfaceSize) -> (u32, u32) {
    (
        size.width.round().max(1.0) as u32,
        size.height.round().max(1.0) as u32,
    )
}

fn premultiply(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
}
