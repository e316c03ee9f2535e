//! Error types for seismic volume operations

use thiserror::Error;

/// Main error type for volume addressing and access operations
#[derive(Error, Debug)]
pub enum SeisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Coordinate not aligned to its axis delta, inconsistent start/end/delta
    /// triple, or an unrecognized storage-order classification. Detected
    /// before any I/O is attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Coordinate aligned but outside the declared axis range.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// A structurally valid request against a storage order / axis
    /// combination with no implemented access path.
    #[error("Unsupported access: {0}")]
    UnsupportedAccess(String),

    /// Wraps an I/O failure from the backing store, tagged with the volume
    /// identity. Never retried here; retry policy belongs to the caller.
    #[error("Backing store error for volume '{volume}': {source}")]
    BackingStore {
        volume: String,
        #[source]
        source: Box<SeisError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized Result type for volume operations
pub type Result<T> = std::result::Result<T, SeisError>;

impl From<serde_json::Error> for SeisError {
    fn from(err: serde_json::Error) -> Self {
        SeisError::Serialization(err.to_string())
    }
}

impl SeisError {
    /// Tag a store-level failure with the identity of the volume it came from.
    pub fn backing_store(volume: impl Into<String>, source: SeisError) -> Self {
        SeisError::BackingStore {
            volume: volume.into(),
            source: Box::new(source),
        }
    }
}
