use crate::annotation::{Annotation, AnnotationId, InjuryRecord, PendingAnnotation};
use crate::error::Result;

/// Receives the plain injury projection after every list mutation, the way
/// an enclosing report form would.
pub trait InjurySink {
    fn injuries_changed(&mut self, injuries: &[InjuryRecord]);
}

impl<F> InjurySink for F
where
    F: FnMut(&[InjuryRecord]),
{
    fn injuries_changed(&mut self, injuries: &[InjuryRecord]) {
        self(injuries)
    }
}

/// Ordered annotation list of one report. Insertion order is creation order.
#[derive(Clone, Debug, Default)]
pub struct InjuryState {
    annotations: Vec<Annotation>,
}

impl InjuryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list with stored injuries. Labels are trusted as-is and
    /// ids are re-issued from 1 in list order. On a malformed location the
    /// list is left untouched.
    pub fn seed(&mut self, records: &[InjuryRecord]) -> Result<()> {
        let mut seeded = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            seeded.push(Annotation {
                id: index as AnnotationId + 1,
                location: record.decode_location()?,
                body_part: record.body_part.clone(),
                path: None,
            });
        }
        self.annotations = seeded;
        Ok(())
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn next_annotation_id(&self) -> AnnotationId {
        self.annotations
            .iter()
            .map(|annotation| annotation.id)
            .max()
            .map_or(1, |id| id.saturating_add(1))
    }

    pub fn commit(&mut self, pending: PendingAnnotation) -> AnnotationId {
        let id = self.next_annotation_id();
        self.annotations.push(Annotation::from_pending(id, pending));
        id
    }

    pub fn undo(&mut self) -> Option<Annotation> {
        self.annotations.pop()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        removed
    }

    pub fn records(&self) -> Vec<InjuryRecord> {
        self.annotations.iter().map(Annotation::to_record).collect()
    }

    pub fn find_annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{InjurySink, InjuryState};
    use crate::annotation::{encode_location, InjuryRecord, PendingAnnotation};
    use crate::geometry::NormalizedPoint;

    fn pending(body_part: &str) -> PendingAnnotation {
        PendingAnnotation::from_path(
            vec![NormalizedPoint::new(0.4, 0.2), NormalizedPoint::new(0.6, 0.3)],
            body_part,
        )
        .expect("non-empty path")
    }

    #[test]
    fn commit_assigns_monotonic_ids() {
        let mut state = InjuryState::new();
        assert_eq!(state.commit(pending("chest")), 1);
        assert_eq!(state.commit(pending("head")), 2);
        assert_eq!(state.undo().map(|a| a.id), Some(2));
        assert_eq!(state.commit(pending("neck")), 2);
        assert_eq!(state.len(), 2);
        assert_eq!(
            state.find_annotation(1).map(|a| a.body_part.as_str()),
            Some("chest")
        );
    }

    #[test]
    fn clear_then_undo_leaves_list_empty() {
        let mut state = InjuryState::new();
        state.commit(pending("chest"));
        assert_eq!(state.clear(), 1);
        assert!(state.undo().is_none());
        assert!(state.is_empty());
        assert_eq!(state.next_annotation_id(), 1);
    }

    #[test]
    fn seed_reissues_ids_and_keeps_labels() {
        let records = vec![
            InjuryRecord {
                id: Some(40),
                location: encode_location(NormalizedPoint::new(0.5, 0.25)),
                body_part: "chest".to_string(),
            },
            InjuryRecord {
                id: None,
                location: encode_location(NormalizedPoint::new(0.0, 0.0)),
                body_part: "unknown".to_string(),
            },
        ];
        let mut state = InjuryState::new();
        state.seed(&records).expect("seed");

        let ids: Vec<u64> = state.annotations().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(state.annotations()[1].body_part, "unknown");
        assert!(state.annotations().iter().all(|a| a.path.is_none()));
        assert_eq!(state.commit(pending("head")), 3);
    }

    #[test]
    fn failed_seed_keeps_existing_list() {
        let mut state = InjuryState::new();
        state.commit(pending("chest"));
        let broken = vec![InjuryRecord {
            id: None,
            location: "oops".to_string(),
            body_part: "head".to_string(),
        }];
        assert!(state.seed(&broken).is_err());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn closures_act_as_sinks() {
        let mut seen = Vec::new();
        let mut sink = |records: &[InjuryRecord]| seen.push(records.len());
        let mut state = InjuryState::new();
        state.commit(pending("chest"));
        sink.injuries_changed(&state.records());
        state.clear();
        sink.injuries_changed(&state.records());
        assert_eq!(seen, vec![1, 0]);
    }
}
