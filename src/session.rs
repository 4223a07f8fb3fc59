//! One editing session over a body-map surface.
//!
//! The session owns the surface, the annotation list and the in-progress
//! stroke. Every mutation redraws synchronously and then notifies the sink,
//! so the surface and the report form never observe a stale list.

use crate::annotation::{Annotation, AnnotationId, InjuryRecord, PendingAnnotation};
use crate::atlas::RegionAtlas;
use crate::error::Result;
use crate::geometry::{DevicePoint, DisplayRect, SurfaceSize};
use crate::render::{self, RenderStyle, Surface};
use crate::state::{InjurySink, InjuryState};
use crate::stroke::StrokeCapture;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// Host input in client (on-screen) coordinates. For touch input the host
/// passes the first touch point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down {
        x: f32,
        y: f32,
        source: PointerSource,
    },
    Move {
        x: f32,
        y: f32,
        source: PointerSource,
    },
    Up,
    Leave,
    Cancel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerOutcome {
    /// The host should suppress scrolling and text selection for this event.
    pub prevent_default: bool,
    pub committed: Option<AnnotationId>,
}

pub struct BodyMapSession<S: Surface, K: InjurySink> {
    surface: S,
    background: Option<S::Image>,
    display: Option<DisplayRect>,
    atlas: RegionAtlas,
    style: RenderStyle,
    state: InjuryState,
    capture: StrokeCapture,
    sink: K,
}

impl<S: Surface, K: InjurySink> BodyMapSession<S, K> {
    pub fn new(surface: S, atlas: RegionAtlas, style: RenderStyle, sink: K) -> Self {
        Self {
            surface,
            background: None,
            display: None,
            atlas,
            style,
            state: InjuryState::new(),
            capture: StrokeCapture::new(),
            sink,
        }
    }

    /// Seeds the list from stored injuries without classifying them.
    pub fn with_initial_injuries(mut self, records: &[InjuryRecord]) -> Result<Self> {
        self.state.seed(records)?;
        tracing::info!(count = self.state.len(), "Seeded body map injuries");
        self.redraw();
        Ok(self)
    }

    pub fn is_ready(&self) -> bool {
        self.background.is_some()
    }

    pub fn is_drawing(&self) -> bool {
        self.capture.is_drawing()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.state.annotations()
    }

    pub fn injuries(&self) -> Vec<InjuryRecord> {
        self.state.records()
    }

    /// Completion signal of the background load. Drawing starts here.
    pub fn background_loaded(&mut self, image: S::Image) {
        self.background = Some(image);
        let size = self.surface.size();
        tracing::info!(
            width = size.width,
            height = size.height,
            "Body map background ready"
        );
        self.redraw();
    }

    pub fn set_display_rect(&mut self, display: DisplayRect) {
        self.display = Some(display);
    }

    /// Resizes the surface and redraws the stored annotations. Labels are
    /// kept; any stroke in progress is abandoned. Passing the current size
    /// changes nothing.
    pub fn resize(&mut self, size: SurfaceSize) -> Result<()> {
        let size = size.validate()?;
        if self.surface.size() == size {
            return Ok(());
        }
        if self.capture.abandon().is_some() {
            tracing::debug!("Abandoned stroke on resize");
        }
        self.surface.resize(size);
        tracing::debug!(width = size.width, height = size.height, "Body map resized");
        self.redraw();
        Ok(())
    }

    /// Drops any stroke in progress without committing it, e.g. when the
    /// host tears the surface down.
    pub fn abandon_stroke(&mut self) {
        if self.capture.abandon().is_some() {
            tracing::debug!("Abandoned stroke");
            self.redraw();
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        let mut outcome = PointerOutcome {
            prevent_default: true,
            committed: None,
        };
        if !self.is_ready() {
            outcome.prevent_default = false;
            return outcome;
        }

        match event {
            PointerEvent::Down { x, y, source } => {
                let point = self.to_device(x, y);
                if self.capture.begin(point) {
                    tracing::trace!(?source, x = point.x, y = point.y, "Stroke started");
                }
            }
            PointerEvent::Move { x, y, .. } => {
                let point = self.to_device(x, y);
                if self.capture.extend(point) {
                    self.redraw();
                }
            }
            PointerEvent::Up | PointerEvent::Leave | PointerEvent::Cancel => {
                outcome.committed = self.release();
            }
        }

        outcome
    }

    /// Appends a labelled stroke, redraws and notifies.
    pub fn commit(&mut self, pending: PendingAnnotation) -> AnnotationId {
        let id = self.state.commit(pending);
        if let Some(annotation) = self.state.find_annotation(id) {
            tracing::info!(id, body_part = %annotation.body_part, "Injury marked");
        }
        self.changed();
        id
    }

    pub fn undo(&mut self) -> Option<Annotation> {
        let removed = self.state.undo();
        if let Some(annotation) = removed.as_ref() {
            tracing::info!(id = annotation.id, body_part = %annotation.body_part, "Injury undone");
        }
        self.changed();
        removed
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.state.clear();
        tracing::info!(removed, "Injuries cleared");
        self.changed();
        removed
    }

    /// Full repaint from the current list and surface size. Does nothing
    /// until the background has loaded.
    pub fn redraw(&mut self) {
        let Some(background) = self.background.as_ref() else {
            return;
        };
        render::redraw(
            &mut self.surface,
            background,
            self.state.annotations(),
            self.capture.live_points(),
            &self.style,
        );
    }

    fn release(&mut self) -> Option<AnnotationId> {
        if !self.capture.is_drawing() {
            return None;
        }
        let surface = self.surface.size();
        match self.capture.release(surface, &self.atlas) {
            Some(pending) => Some(self.commit(pending)),
            None => {
                tracing::debug!("Discarded single-sample stroke");
                self.redraw();
                None
            }
        }
    }

    fn changed(&mut self) {
        self.redraw();
        let records = self.state.records();
        self.sink.injuries_changed(&records);
    }

    fn to_device(&self, client_x: f32, client_y: f32) -> DevicePoint {
        let surface = self.surface.size();
        self.display
            .unwrap_or_else(|| DisplayRect::unscaled(surface))
            .to_device(client_x, client_y, surface)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use assert_matches::assert_matches;

    use super::{BodyMapSession, PointerEvent, PointerSource};
    use crate::annotation::{encode_location, InjuryRecord};
    use crate::atlas::RegionAtlas;
    use crate::error::BodyMapError;
    use crate::geometry::{DisplayRect, NormalizedPoint, SurfaceSize};
    use crate::render::testing::{DrawCall, RecordingSurface};
    use crate::render::{RenderStyle, Surface};

    type Notifications = Vec<Vec<InjuryRecord>>;
    type TestSession = BodyMapSession<RecordingSurface, Box<dyn FnMut(&[InjuryRecord])>>;

    fn ready_session(size: SurfaceSize) -> (TestSession, Rc<RefCell<Notifications>>) {
        let log = Rc::new(RefCell::new(Notifications::new()));
        let sink_log = Rc::clone(&log);
        let sink: Box<dyn FnMut(&[InjuryRecord])> = Box::new(move |records: &[InjuryRecord]| {
            sink_log.borrow_mut().push(records.to_vec())
        });
        let mut session = BodyMapSession::new(
            RecordingSurface::new(size),
            RegionAtlas::body(),
            RenderStyle::default(),
            sink,
        );
        session.background_loaded(());
        (session, log)
    }

    fn down(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Down {
            x,
            y,
            source: PointerSource::Mouse,
        }
    }

    fn moved(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Move {
            x,
            y,
            source: PointerSource::Mouse,
        }
    }

    #[test]
    fn chest_stroke_commits_and_notifies() {
        let (mut session, log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(190.0, 140.0));
        session.handle_pointer(moved(210.0, 150.0));
        session.handle_pointer(moved(195.0, 160.0));
        let outcome = session.handle_pointer(PointerEvent::Up);

        assert!(outcome.prevent_default);
        assert_eq!(outcome.committed, Some(1));
        assert_eq!(session.annotations()[0].body_part, "chest");

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0][0].id, Some(1));
        assert_eq!(log[0][0].body_part, "chest");
        let location = log[0][0].decode_location().expect("location");
        // (190 + 210 + 195) / 3 = 198.33 of 400.
        assert!((location.x - 0.495_833_3).abs() < 1e-4);
        assert!((location.y - 0.25).abs() < 1e-4);
    }

    #[test]
    fn tap_is_discarded_without_notification() {
        let (mut session, log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(200.0, 155.0));
        let outcome = session.handle_pointer(PointerEvent::Up);
        assert_eq!(outcome.committed, None);
        assert!(session.annotations().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn pointer_leave_releases_stroke() {
        let (mut session, _log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(190.0, 140.0));
        session.handle_pointer(moved(210.0, 150.0));
        let outcome = session.handle_pointer(PointerEvent::Leave);
        assert_eq!(outcome.committed, Some(1));
        assert!(!session.is_drawing());
    }

    #[test]
    fn touch_and_mouse_map_through_same_display_scaling() {
        let (mut session, _log) = ready_session(SurfaceSize::REFERENCE);
        // Backing store 400x600 shown at 200x300 with a (50, 10) offset.
        session.set_display_rect(DisplayRect::new(50.0, 10.0, 200.0, 300.0));
        session.handle_pointer(PointerEvent::Down {
            x: 145.0,
            y: 80.0,
            source: PointerSource::Touch,
        });
        session.handle_pointer(PointerEvent::Move {
            x: 155.0,
            y: 85.0,
            source: PointerSource::Mouse,
        });
        session.handle_pointer(PointerEvent::Cancel);

        let annotation = &session.annotations()[0];
        let path = annotation.path.as_ref().expect("path");
        assert!((path[0].x - 0.475).abs() < 1e-6);
        assert!((path[0].y - 0.233_333).abs() < 1e-5);
        assert_eq!(annotation.body_part, "chest");
    }

    #[test]
    fn live_stroke_is_redrawn_on_extend() {
        let (mut session, _log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(10.0, 10.0));
        session.handle_pointer(moved(20.0, 20.0));
        let last = session.surface().calls.last().cloned();
        assert_matches!(
            last,
            Some(DrawCall::Path { closed: false, ref points }) if points.len() == 2
        );
    }

    #[test]
    fn input_before_background_is_ignored() {
        let sink = |_: &[InjuryRecord]| {};
        let mut session = BodyMapSession::new(
            RecordingSurface::new(SurfaceSize::REFERENCE),
            RegionAtlas::body(),
            RenderStyle::default(),
            sink,
        );
        let outcome = session.handle_pointer(down(190.0, 140.0));
        assert!(!outcome.prevent_default);
        assert!(!session.is_drawing());
        session.redraw();
        assert!(session.surface().calls.is_empty());
    }

    #[test]
    fn label_survives_resize() {
        let (mut session, _log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(190.0, 140.0));
        session.handle_pointer(moved(210.0, 150.0));
        session.handle_pointer(moved(195.0, 160.0));
        session.handle_pointer(PointerEvent::Up);

        session
            .resize(SurfaceSize::new(300.0, 450.0))
            .expect("valid size");
        assert_eq!(session.annotations()[0].body_part, "chest");
        assert_eq!(session.surface().labels(), vec!["chest"]);
        assert!(session
            .surface()
            .calls
            .contains(&DrawCall::Image {
                width: 300.0,
                height: 450.0
            }));
    }

    #[test]
    fn same_size_resize_keeps_stroke_in_progress() {
        let (mut session, log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(190.0, 140.0));
        session.resize(SurfaceSize::REFERENCE).expect("valid size");
        session.handle_pointer(moved(210.0, 150.0));
        session.resize(SurfaceSize::REFERENCE).expect("valid size");
        session.handle_pointer(moved(195.0, 160.0));
        assert!(session.is_drawing());

        let outcome = session.handle_pointer(PointerEvent::Up);
        assert_eq!(outcome.committed, Some(1));
        assert_eq!(session.annotations()[0].body_part, "chest");
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn resize_abandons_stroke_and_rejects_empty_size() {
        let (mut session, log) = ready_session(SurfaceSize::REFERENCE);
        session.handle_pointer(down(190.0, 140.0));
        session.handle_pointer(moved(210.0, 150.0));
        session
            .resize(SurfaceSize::new(500.0, 750.0))
            .expect("valid size");
        assert!(!session.is_drawing());
        assert_eq!(session.handle_pointer(PointerEvent::Up).committed, None);
        assert!(log.borrow().is_empty());

        assert_matches!(
            session.resize(SurfaceSize::new(0.0, 750.0)),
            Err(BodyMapError::InvalidSurface { .. })
        );
        assert_eq!(session.surface().size(), SurfaceSize::new(500.0, 750.0));
    }

    #[test]
    fn undo_and_clear_notify_even_when_empty() {
        let (mut session, log) = ready_session(SurfaceSize::REFERENCE);
        assert_eq!(session.clear(), 0);
        assert!(session.undo().is_none());
        assert!(session.annotations().is_empty());
        assert_eq!(log.borrow().len(), 2);
        assert!(log.borrow().iter().all(Vec::is_empty));
    }

    #[test]
    fn seeded_markers_render_as_dots_and_keep_labels() {
        let records = vec![InjuryRecord {
            id: None,
            location: encode_location(NormalizedPoint::new(0.5, 0.5)),
            body_part: "abdomen".to_string(),
        }];
        let (session, log) = ready_session(SurfaceSize::new(500.0, 750.0));
        let session = session.with_initial_injuries(&records).expect("seed");
        assert!(log.borrow().is_empty());
        assert_eq!(session.injuries()[0].id, Some(1));
        assert_eq!(session.surface().labels(), vec!["abdomen"]);
        assert!(session
            .surface()
            .calls
            .iter()
            .any(|call| matches!(call, DrawCall::Circle { .. })));
    }
}
