use serde::{de::Visitor, Deserialize, Deserializer, Serialize};

use crate::atlas::UNKNOWN_REGION;
use crate::error::{BodyMapError, Result};
use crate::geometry::{centroid, NormalizedPoint};

pub type AnnotationId = u64;

/// A committed injury mark. Only normalized points are stored here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub location: NormalizedPoint,
    pub body_part: String,
    pub path: Option<Vec<NormalizedPoint>>,
}

/// A released stroke that has been labelled but not yet given an id.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingAnnotation {
    pub path: Vec<NormalizedPoint>,
    pub location: NormalizedPoint,
    pub body_part: String,
}

impl PendingAnnotation {
    pub fn from_path(path: Vec<NormalizedPoint>, body_part: impl Into<String>) -> Option<Self> {
        let location = centroid(&path)?;
        Some(Self {
            path,
            location,
            body_part: body_part.into(),
        })
    }
}

impl Annotation {
    pub fn from_pending(id: AnnotationId, pending: PendingAnnotation) -> Self {
        Self {
            id,
            location: pending.location,
            body_part: pending.body_part,
            path: Some(pending.path),
        }
    }

    pub fn is_known(&self) -> bool {
        is_known_body_part(&self.body_part)
    }

    /// Plain projection handed to the report form; the path is not persisted.
    pub fn to_record(&self) -> InjuryRecord {
        InjuryRecord {
            id: Some(self.id),
            location: encode_location(self.location),
            body_part: self.body_part.clone(),
        }
    }
}

/// The shape the report store persists: `location` is the JSON-encoded
/// normalized centroid, e.g. `{"x":0.49,"y":0.25}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InjuryRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_record_id"
    )]
    pub id: Option<AnnotationId>,
    pub location: String,
    pub body_part: String,
}

impl InjuryRecord {
    pub fn decode_location(&self) -> Result<NormalizedPoint> {
        serde_json::from_str(&self.location).map_err(|source| BodyMapError::MalformedLocation {
            location: self.location.clone(),
            source,
        })
    }

    pub fn is_valid(&self) -> bool {
        !self.location.trim().is_empty() && is_known_body_part(&self.body_part)
    }
}

/// JSON-encodes a normalized point as `{"x":..,"y":..}`. Non-finite
/// coordinates become `null` and fail to decode later.
pub fn encode_location(point: NormalizedPoint) -> String {
    // Two floats into a string buffer cannot fail.
    serde_json::to_string(&point).unwrap_or_default()
}

pub fn is_known_body_part(body_part: &str) -> bool {
    !body_part.is_empty() && body_part != UNKNOWN_REGION
}

pub fn valid_injuries(records: &[InjuryRecord]) -> Vec<&InjuryRecord> {
    records.iter().filter(|record| record.is_valid()).collect()
}

/// Submission rule: a report needs at least one injury on a known body part.
pub fn require_valid_injuries(records: &[InjuryRecord]) -> Result<Vec<&InjuryRecord>> {
    let valid = valid_injuries(records);
    if valid.is_empty() {
        return Err(BodyMapError::NoValidInjury);
    }
    Ok(valid)
}

fn deserialize_record_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<AnnotationId>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RecordIdVisitor;

    impl<'de> Visitor<'de> for RecordIdVisitor {
        type Value = Option<AnnotationId>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("injury id as a number, a numeric string or null")
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom(format!("negative injury id {value}")))
        }

        // Store ids are opaque strings; they are re-issued on load anyway.
        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.parse::<AnnotationId>().ok())
        }

        fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(RecordIdVisitor)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{
        encode_location, require_valid_injuries, valid_injuries, Annotation, InjuryRecord,
        PendingAnnotation,
    };
    use crate::error::BodyMapError;
    use crate::geometry::NormalizedPoint;

    fn record(location: &str, body_part: &str) -> InjuryRecord {
        InjuryRecord {
            id: None,
            location: location.to_string(),
            body_part: body_part.to_string(),
        }
    }

    #[test]
    fn record_projection_drops_path() {
        let pending = PendingAnnotation::from_path(
            vec![NormalizedPoint::new(0.25, 0.5), NormalizedPoint::new(0.75, 0.5)],
            "chest",
        )
        .expect("non-empty path");
        let annotation = Annotation::from_pending(3, pending);

        let json = serde_json::to_value(annotation.to_record()).expect("record json");
        assert_eq!(json["id"], 3);
        assert_eq!(json["bodyPart"], "chest");
        assert!(json.get("path").is_none());

        let location: NormalizedPoint =
            serde_json::from_str(json["location"].as_str().expect("location string"))
                .expect("location json");
        assert_eq!(location, NormalizedPoint::new(0.5, 0.5));
    }

    #[test]
    fn location_round_trips_through_json_string() {
        let point = NormalizedPoint::new(0.4916667, 0.25);
        let encoded = encode_location(point);
        let decoded = record(&encoded, "chest")
            .decode_location()
            .expect("decodes");
        assert_eq!(decoded, point);
    }

    #[test]
    fn location_is_plain_json_object() {
        assert_eq!(
            encode_location(NormalizedPoint::new(0.5, 0.25)),
            r#"{"x":0.5,"y":0.25}"#
        );
        assert_eq!(
            encode_location(NormalizedPoint::new(f32::INFINITY, 0.5)),
            r#"{"x":null,"y":0.5}"#
        );
    }

    #[test]
    fn malformed_location_is_reported() {
        assert_matches!(
            record("not json", "chest").decode_location(),
            Err(BodyMapError::MalformedLocation { .. })
        );
        let non_finite = encode_location(NormalizedPoint::new(f32::NAN, 0.5));
        assert_matches!(
            record(&non_finite, "chest").decode_location(),
            Err(BodyMapError::MalformedLocation { .. })
        );
    }

    #[test]
    fn record_id_accepts_numbers_strings_and_absence() {
        let numeric: InjuryRecord =
            serde_json::from_str(r#"{"id":4,"location":"{}","bodyPart":"head"}"#)
                .expect("numeric id");
        assert_eq!(numeric.id, Some(4));

        let textual: InjuryRecord =
            serde_json::from_str(r#"{"id":"12","location":"{}","bodyPart":"head"}"#)
                .expect("string id");
        assert_eq!(textual.id, Some(12));

        let opaque: InjuryRecord =
            serde_json::from_str(r#"{"id":"ckx9a","location":"{}","bodyPart":"head"}"#)
                .expect("opaque id");
        assert_eq!(opaque.id, None);

        let missing: InjuryRecord =
            serde_json::from_str(r#"{"location":"{}","bodyPart":"head"}"#).expect("no id");
        assert_eq!(missing.id, None);
    }

    #[test]
    fn unknown_body_parts_are_not_valid_injuries() {
        let records = vec![
            record(r#"{"x":0.5,"y":0.25}"#, "chest"),
            record(r#"{"x":0.0,"y":0.0}"#, "unknown"),
            record("", "head"),
        ];
        let valid = valid_injuries(&records);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].body_part, "chest");

        let only_unknown = vec![record(r#"{"x":0.0,"y":0.0}"#, "unknown")];
        assert_matches!(
            require_valid_injuries(&only_unknown),
            Err(BodyMapError::NoValidInjury)
        );
    }
}
