//! Injury body-map annotation engine.
//!
//! Freehand strokes captured on a drawing surface are stored in
//! resolution-independent coordinates, labelled with the body part under
//! their centroid, and redrawn at whatever size the surface currently has.

pub mod annotation;
pub mod atlas;
pub mod error;
pub mod flatten;
pub mod geometry;
pub mod render;
pub mod session;
pub mod settings;
pub mod state;
pub mod stroke;

pub use annotation::{Annotation, AnnotationId, InjuryRecord, PendingAnnotation};
pub use atlas::{Region, RegionAtlas, UNKNOWN_REGION};
pub use error::BodyMapError;
pub use geometry::{DevicePoint, DisplayRect, NormalizedPoint, SurfaceSize};
pub use render::{RenderStyle, Surface};
pub use session::{BodyMapSession, PointerEvent, PointerOutcome, PointerSource};
pub use state::{InjurySink, InjuryState};
