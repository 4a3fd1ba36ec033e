//! Normalization of raw location sensor readings.

use log::debug;
use pinged_types::geo::{GeoPoint, GeoPoint2d, NewGeoPoint};
use web_time::SystemTime;

/// One reading from the device location sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Reported position.
    pub position: GeoPoint2d,
    /// Radius of the 68% confidence circle in meters. Infinite if the sensor did not report it.
    pub accuracy_m: f64,
    /// Time the reading was taken.
    pub timestamp: SystemTime,
}

impl LocationFix {
    /// Creates a new fix with unknown accuracy.
    pub fn new(lat: f64, lon: f64, timestamp: SystemTime) -> Self {
        Self {
            position: GeoPoint2d::latlon(lat, lon),
            accuracy_m: f64::INFINITY,
            timestamp,
        }
    }

    /// Sets the accuracy of the fix. Negative and NaN values are treated as unknown accuracy.
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = if accuracy_m.is_nan() || accuracy_m < 0.0 {
            f64::INFINITY
        } else {
            accuracy_m
        };
        self
    }
}

/// How a fix was classified by [`GeoFixFilter::ingest`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixDecision {
    /// The first valid fix since the filter was created.
    First,
    /// A valid fix following an earlier one.
    Update,
    /// Fix has invalid coordinates and must be ignored.
    Rejected,
}

/// Tracks the stream of location fixes and decides whether each one is usable.
///
/// The filter has no throttling of its own: the sensor may deliver fixes at any rate.
#[derive(Debug, Clone, Default)]
pub struct GeoFixFilter {
    accepted: u64,
    best_accuracy_m: Option<f64>,
}

impl GeoFixFilter {
    /// Creates a filter that has not seen any fix yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies the fix and updates the best known accuracy.
    ///
    /// Fixes with non-finite or out of range coordinates are rejected without changing the state
    /// of the filter. Best accuracy only ever decreases.
    pub fn ingest(&mut self, fix: &LocationFix) -> FixDecision {
        if !fix.position.is_valid() {
            debug!(
                "Rejected location fix with invalid coordinates: {}, {}",
                fix.position.lat(),
                fix.position.lon()
            );
            return FixDecision::Rejected;
        }

        let accuracy = if fix.accuracy_m.is_nan() {
            f64::INFINITY
        } else {
            fix.accuracy_m
        };

        self.accepted += 1;
        match self.best_accuracy_m {
            None => {
                self.best_accuracy_m = Some(accuracy);
                FixDecision::First
            }
            Some(best) => {
                self.best_accuracy_m = Some(best.min(accuracy));
                FixDecision::Update
            }
        }
    }

    /// Best accuracy seen so far, in meters. Infinite if no fix with known accuracy was accepted.
    pub fn best_accuracy_m(&self) -> f64 {
        self.best_accuracy_m.unwrap_or(f64::INFINITY)
    }

    /// Returns true if at least one fix was accepted.
    pub fn has_fix(&self) -> bool {
        self.accepted > 0
    }

    /// Number of accepted fixes.
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }
}
