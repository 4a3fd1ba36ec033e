//! Error types used by the crate.
//!
//! Only failures at the boundaries of the engine produce errors: the location sensor, the routing
//! service, the persisted storage, the clipboard and the rendering engine. Decisions made inside the
//! components (a cancelled gesture, a layer that already exists) are normal control flow.

use thiserror::Error;

/// Location sensor failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeolocationError {
    /// The platform has no location sensor.
    #[error("geolocation is not supported")]
    Unsupported,
    /// The user refused to share their position.
    #[error("permission to access location was denied")]
    PermissionDenied,
    /// The sensor exists, but could not provide a position.
    #[error("location is unavailable: {0}")]
    Unavailable(String),
}

/// Routing service failure. Routing requests are never retried, so this error is always shown
/// to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// Request could not be sent or the response could not be read.
    #[error("routing request failed: {0}")]
    Network(String),
    /// Service responded with a non-success HTTP status.
    #[error("routing service responded with status {0}")]
    Status(u16),
    /// Response body is not a valid routing response.
    #[error("failed to decode routing response: {0}")]
    Decoding(String),
    /// Request was valid, but the service found no route.
    #[error("no route found")]
    NoRoute,
    /// Origin or destination coordinates are invalid.
    #[error("invalid route endpoints")]
    InvalidRequest,
}

impl From<serde_json::Error> for RoutingError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for RoutingError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Network(value.to_string()),
        }
    }
}

/// Persisted storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error reading/writing data to the file system.
    #[error("storage i/o error")]
    Io(#[from] std::io::Error),
    /// Stored value could not be encoded.
    #[error("failed to encode stored value")]
    Encoding(#[from] serde_json::Error),
    /// Storage is not available in this environment (e.g. disabled by the user).
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// Clipboard failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClipboardError {
    /// Clipboard cannot be accessed.
    #[error("clipboard is unavailable: {0}")]
    Unavailable(String),
}

/// Rendering engine failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Engine could not be initialized. The map cannot be shown at all.
    #[error("failed to initialize the map: {0}")]
    Init(String),
    /// Style with the given url is not known to the engine.
    #[error("unknown style: {0}")]
    UnknownStyle(String),
    /// Source with the given id already exists.
    #[error("source already exists: {0}")]
    DuplicateSource(String),
    /// Source with the given id does not exist.
    #[error("source not found: {0}")]
    UnknownSource(String),
    /// Source cannot be removed while a layer draws it.
    #[error("source is still used by a layer: {0}")]
    SourceInUse(String),
    /// Layer with the given id already exists.
    #[error("layer already exists: {0}")]
    DuplicateLayer(String),
    /// Layer with the given id does not exist.
    #[error("layer not found: {0}")]
    UnknownLayer(String),
    /// Marker with the given key does not exist.
    #[error("marker not found: {0}")]
    UnknownMarker(String),
    /// Popup with the given id is not open.
    #[error("popup is not open: {0}")]
    UnknownPopup(u64),
}

/// Crate error type.
#[derive(Debug, Error)]
pub enum PingedError {
    /// Location sensor failure.
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
    /// Routing failure.
    #[error(transparent)]
    Routing(#[from] RoutingError),
    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Clipboard failure.
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    /// Rendering engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
