//! Body-part regions and nearest-center classification.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{BodyMapError, Result};
use crate::geometry::{DevicePoint, SurfaceSize};

pub const UNKNOWN_REGION: &str = "unknown";

/// Axis-aligned rectangle in atlas reference coordinates. Bounds are
/// inclusive on every side.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub name: String,
    pub x: [f32; 2],
    pub y: [f32; 2],
}

impl Region {
    pub fn new(name: impl Into<String>, x: [f32; 2], y: [f32; 2]) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }

    pub fn center(&self) -> DevicePoint {
        DevicePoint::new((self.x[0] + self.x[1]) / 2.0, (self.y[0] + self.y[1]) / 2.0)
    }

    pub fn contains(&self, point: DevicePoint) -> bool {
        point.x >= self.x[0] && point.x <= self.x[1] && point.y >= self.y[0] && point.y <= self.y[1]
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegionAtlas {
    reference: SurfaceSize,
    regions: Vec<Region>,
}

impl Default for RegionAtlas {
    fn default() -> Self {
        Self::body()
    }
}

impl RegionAtlas {
    pub fn new(reference: SurfaceSize, regions: Vec<Region>) -> Result<Self> {
        let atlas = Self { reference, regions };
        atlas.validate()?;
        Ok(atlas)
    }

    /// Front-facing silhouette authored at 400x600.
    pub fn body() -> Self {
        let regions = vec![
            Region::new("head", [150.0, 250.0], [0.0, 100.0]),
            Region::new("face", [160.0, 240.0], [20.0, 80.0]),
            Region::new("neck", [160.0, 240.0], [80.0, 110.0]),
            Region::new("leftShoulder", [100.0, 150.0], [100.0, 150.0]),
            Region::new("rightShoulder", [250.0, 300.0], [100.0, 150.0]),
            Region::new("leftUpperArm", [80.0, 150.0], [150.0, 250.0]),
            Region::new("rightUpperArm", [250.0, 320.0], [150.0, 250.0]),
            Region::new("leftLowerArm", [60.0, 130.0], [250.0, 350.0]),
            Region::new("rightLowerArm", [270.0, 340.0], [250.0, 350.0]),
            Region::new("chest", [150.0, 250.0], [110.0, 200.0]),
            Region::new("abdomen", [150.0, 250.0], [200.0, 300.0]),
            Region::new("leftHip", [130.0, 180.0], [300.0, 350.0]),
            Region::new("rightHip", [220.0, 270.0], [300.0, 350.0]),
            Region::new("leftThigh", [130.0, 200.0], [350.0, 450.0]),
            Region::new("rightThigh", [200.0, 270.0], [350.0, 450.0]),
            Region::new("leftKnee", [130.0, 200.0], [450.0, 480.0]),
            Region::new("rightKnee", [200.0, 270.0], [450.0, 480.0]),
            Region::new("leftLowerLeg", [130.0, 200.0], [480.0, 580.0]),
            Region::new("rightLowerLeg", [200.0, 270.0], [480.0, 580.0]),
            Region::new("leftFoot", [130.0, 200.0], [580.0, 600.0]),
            Region::new("rightFoot", [200.0, 270.0], [580.0, 600.0]),
        ];
        Self {
            reference: SurfaceSize::REFERENCE,
            regions,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let atlas: Self = serde_json::from_str(raw).map_err(|source| BodyMapError::Parse {
            what: "region atlas",
            source,
        })?;
        atlas.validate()?;
        Ok(atlas)
    }

    pub fn reference(&self) -> SurfaceSize {
        self.reference
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// Maps a device point on a surface of `surface` size into the atlas
    /// reference space.
    pub fn to_reference(&self, point: DevicePoint, surface: SurfaceSize) -> DevicePoint {
        if !surface.is_valid() {
            return point;
        }
        let scale_x = surface.width / self.reference.width;
        let scale_y = surface.height / self.reference.height;
        DevicePoint::new(point.x / scale_x, point.y / scale_y)
    }

    /// Picks the containing region whose center is nearest to `point`.
    /// Regions that do not contain the point never win, however close their
    /// center is.
    pub fn classify(&self, point: DevicePoint, surface: SurfaceSize) -> &str {
        let reference_point = self.to_reference(point, surface);

        let mut best_match = UNKNOWN_REGION;
        let mut smallest_distance = f32::INFINITY;
        for region in &self.regions {
            if !region.contains(reference_point) {
                continue;
            }
            let distance = reference_point.distance(region.center());
            if distance < smallest_distance {
                smallest_distance = distance;
                best_match = &region.name;
            }
        }

        best_match
    }

    fn validate(&self) -> Result<()> {
        if !self.reference.is_valid() {
            return Err(BodyMapError::InvalidAtlas(format!(
                "reference size {}x{} must be positive",
                self.reference.width, self.reference.height
            )));
        }
        if self.regions.is_empty() {
            return Err(BodyMapError::InvalidAtlas("no regions".to_string()));
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.name.trim().is_empty() {
                return Err(BodyMapError::InvalidAtlas("empty region name".to_string()));
            }
            if region.name == UNKNOWN_REGION {
                return Err(BodyMapError::InvalidAtlas(format!(
                    "'{UNKNOWN_REGION}' is reserved for unmatched points"
                )));
            }
            if !seen.insert(region.name.as_str()) {
                return Err(BodyMapError::InvalidAtlas(format!(
                    "duplicate region '{}'",
                    region.name
                )));
            }
            let finite = region.x.iter().chain(region.y.iter()).all(|v| v.is_finite());
            if !finite || region.x[0] > region.x[1] || region.y[0] > region.y[1] {
                return Err(BodyMapError::InvalidAtlas(format!(
                    "region '{}' has inverted or non-finite bounds",
                    region.name
                )));
            }
        }
        Ok(())
    }
}
