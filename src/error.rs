#[derive(Debug, thiserror::Error)]
pub enum BodyMapError {
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurface { width: f32, height: f32 },

    #[error("Invalid region atlas: {0}")]
    InvalidAtlas(String),

    #[error("Malformed injury location '{location}': {source}")]
    MalformedLocation {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("At least one valid injury with known body part is required")]
    NoValidInjury,

    #[error("Cannot parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BodyMapError>;
