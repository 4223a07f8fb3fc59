use crate::annotation::PendingAnnotation;
use crate::atlas::RegionAtlas;
use crate::geometry::{
    centroid, denormalize, normalize, DevicePoint, NormalizedPoint, SurfaceSize,
};

/// Fewer samples than this on release is an accidental tap.
pub const MIN_STROKE_POINTS: usize = 2;

/// Raw device samples of one pointer-down-to-release gesture. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    points: Vec<DevicePoint>,
}

impl Stroke {
    fn start(point: DevicePoint) -> Self {
        Self {
            points: vec![point],
        }
    }

    pub fn points(&self) -> &[DevicePoint] {
        &self.points
    }
}

#[derive(Clone, Debug, Default)]
pub struct StrokeCapture {
    current: Option<Stroke>,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.current.is_some()
    }

    pub fn live_points(&self) -> Option<&[DevicePoint]> {
        self.current.as_ref().map(Stroke::points)
    }

    /// Returns false when a stroke is already in progress; a missed release
    /// must not restart the gesture.
    pub fn begin(&mut self, point: DevicePoint) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(Stroke::start(point));
        true
    }

    pub fn extend(&mut self, point: DevicePoint) -> bool {
        let Some(stroke) = self.current.as_mut() else {
            return false;
        };
        stroke.points.push(point);
        true
    }

    /// Ends the gesture. Labels the stroke by the centroid of its normalized
    /// points so the label does not drift with surface size.
    pub fn release(
        &mut self,
        surface: SurfaceSize,
        atlas: &RegionAtlas,
    ) -> Option<PendingAnnotation> {
        let stroke = self.current.take()?;
        if stroke.points.len() < MIN_STROKE_POINTS {
            return None;
        }

        let path: Vec<NormalizedPoint> = stroke
            .points
            .iter()
            .map(|point| normalize(*point, surface))
            .collect();
        let location = centroid(&path)?;
        let body_part = atlas
            .classify(denormalize(location, surface), surface)
            .to_string();

        Some(PendingAnnotation {
            path,
            location,
            body_part,
        })
    }

    pub fn abandon(&mut self) -> Option<Stroke> {
        self.current.take()
    }
}
