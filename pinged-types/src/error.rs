//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, PartialEq)]
pub enum PingedTypesError {
    /// Coordinates are not finite or are outside of the valid latitude/longitude range.
    #[error("invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate {
        /// Latitude that was given.
        lat: f64,
        /// Longitude that was given.
        lon: f64,
    },
}
