//! Device and normalized coordinate spaces.
//!
//! A [`DevicePoint`] is a pixel position on the live drawing surface and is
//! only meaningful together with the [`SurfaceSize`] it was captured on. A
//! [`NormalizedPoint`] lives in the unit square and survives any resize, so
//! it is the only point type that is ever persisted.

use serde::{Deserialize, Serialize};

use crate::error::{BodyMapError, Result};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    /// Size the region atlas is authored against.
    pub const REFERENCE: Self = Self {
        width: 400.0,
        height: 600.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(BodyMapError::InvalidSurface {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DevicePoint {
    pub x: f32,
    pub y: f32,
}

impl DevicePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: DevicePoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Caller must guarantee `surface.is_valid()`.
pub fn normalize(point: DevicePoint, surface: SurfaceSize) -> NormalizedPoint {
    NormalizedPoint {
        x: point.x / surface.width,
        y: point.y / surface.height,
    }
}

pub fn denormalize(point: NormalizedPoint, surface: SurfaceSize) -> DevicePoint {
    DevicePoint {
        x: point.x * surface.width,
        y: point.y * surface.height,
    }
}

pub fn centroid(points: &[NormalizedPoint]) -> Option<NormalizedPoint> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as f32;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0_f32, 0.0_f32), |(x, y), p| (x + p.x, y + p.y));
    Some(NormalizedPoint {
        x: sum_x / count,
        y: sum_y / count,
    })
}

/// Where the surface is shown on screen. The host may display the backing
/// store scaled (CSS-style fit), so client coordinates need both the offset
/// and the display-to-backing ratio before they are device coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Displayed one-to-one at the origin.
    pub fn unscaled(surface: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, surface.width, surface.height)
    }

    pub fn to_device(self, client_x: f32, client_y: f32, surface: SurfaceSize) -> DevicePoint {
        let scale_x = if self.width > 0.0 {
            surface.width / self.width
        } else {
            1.0
        };
        let scale_y = if self.height > 0.0 {
            surface.height / self.height
        } else {
            1.0
        };
        DevicePoint {
            x: (client_x - self.left) * scale_x,
            y: (client_y - self.top) * scale_y,
        }
    }

    pub fn contains(self, client_x: f32, client_y: f32) -> bool {
        client_x >= self.left
            && client_x <= self.left + self.width
            && client_y >= self.top
            && client_y <= self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::{
        centroid, denormalize, normalize, DevicePoint, DisplayRect, NormalizedPoint, SurfaceSize,
    };

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3
    }

    #[test]
    fn normalize_round_trips_across_sizes() {
        let sizes = [
            SurfaceSize::new(300.0, 450.0),
            SurfaceSize::new(400.0, 600.0),
            SurfaceSize::new(1920.0, 1080.0),
            SurfaceSize::new(0.5, 3.0),
        ];
        let points = [
            DevicePoint::new(0.0, 0.0),
            DevicePoint::new(190.0, 140.0),
            DevicePoint::new(-25.5, 812.25),
        ];
        for size in sizes {
            for point in points {
                let back = denormalize(normalize(point, size), size);
                assert!(close(back.x, point.x), "{point:?} at {size:?} -> {back:?}");
                assert!(close(back.y, point.y), "{point:?} at {size:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn centroid_is_mean_of_points() {
        let points = [
            NormalizedPoint::new(0.0, 0.0),
            NormalizedPoint::new(1.0, 0.5),
            NormalizedPoint::new(0.5, 1.0),
        ];
        let c = centroid(&points).expect("non-empty");
        assert!(close(c.x, 0.5));
        assert!(close(c.y, 0.5));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn display_rect_scales_css_sized_surface() {
        let surface = SurfaceSize::new(400.0, 600.0);
        // Backing store of 400x600 shown at half size, offset by (10, 20).
        let display = DisplayRect::new(10.0, 20.0, 200.0, 300.0);
        let device = display.to_device(110.0, 95.0, surface);
        assert!(close(device.x, 200.0));
        assert!(close(device.y, 150.0));
    }

    #[test]
    fn unscaled_display_is_identity() {
        let surface = SurfaceSize::new(500.0, 750.0);
        let device = DisplayRect::unscaled(surface).to_device(42.0, 17.0, surface);
        assert_eq!(device, DevicePoint::new(42.0, 17.0));
    }

    #[test]
    fn invalid_surface_is_rejected() {
        assert!(SurfaceSize::new(0.0, 600.0).validate().is_err());
        assert!(SurfaceSize::new(400.0, f32::NAN).validate().is_err());
        assert!(SurfaceSize::REFERENCE.validate().is_ok());
    }
}
