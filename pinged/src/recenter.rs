//! Decides when the viewport should follow the user's position.

use std::time::Duration;

use log::debug;
use pinged_types::geo::{Datum, GeoPoint};
use web_time::SystemTime;

use crate::fix::LocationFix;

const DEFAULT_MIN_DISTANCE_M: f64 = 400.0;
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(20_000);

/// Configuration of a [`RecenterPolicy`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RecenterConfig {
    min_distance_m: f64,
    min_interval: Duration,
    datum: Datum,
}

impl Default for RecenterConfig {
    fn default() -> Self {
        Self {
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            min_interval: DEFAULT_MIN_INTERVAL,
            datum: Datum::SPHERE,
        }
    }
}

impl RecenterConfig {
    /// The viewport is recentered only if the fix is further than this from the current center.
    pub fn min_distance_m(&self) -> f64 {
        self.min_distance_m
    }

    /// Sets the minimum distance that triggers recentering.
    pub fn with_min_distance_m(mut self, distance: f64) -> Self {
        self.min_distance_m = distance;
        self
    }

    /// The viewport is recentered only if more than this time elapsed since the last recentering.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sets the minimum interval between two recenterings.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Datum used to calculate distances.
    pub fn datum(&self) -> Datum {
        self.datum
    }
}

/// Two-part gate for following the user: the fix must be far enough from the viewport center
/// **and** enough time must have passed since the viewport was last recentered.
///
/// The very first fix is not evaluated by the policy: the caller always centers on it and then
/// reports it with [`RecenterPolicy::on_recentered`].
#[derive(Debug, Clone, Default)]
pub struct RecenterPolicy {
    config: RecenterConfig,
    last_recenter: Option<SystemTime>,
}

impl RecenterPolicy {
    /// Creates a new policy.
    pub fn new(config: RecenterConfig) -> Self {
        Self {
            config,
            last_recenter: None,
        }
    }

    /// Configuration of the policy.
    pub fn config(&self) -> &RecenterConfig {
        &self.config
    }

    /// Returns true if the viewport should be moved to the position of `fix`.
    pub fn should_recenter(
        &self,
        current_center: &impl GeoPoint<Num = f64>,
        fix: &LocationFix,
        now: SystemTime,
    ) -> bool {
        let distance = current_center.distance(&fix.position, &self.config.datum);
        if distance.is_nan() || distance <= self.config.min_distance_m {
            return false;
        }

        let interval_passed = match self.last_recenter {
            Some(last) => now.duration_since(last).unwrap_or_default() > self.config.min_interval,
            None => true,
        };

        debug!(
            "Fix is {distance:.0} m from the viewport center, interval passed: {interval_passed}"
        );
        interval_passed
    }

    /// Records that the viewport was recentered at `now`.
    pub fn on_recentered(&mut self, now: SystemTime) {
        self.last_recenter = Some(now);
    }

    /// Time of the last recentering.
    pub fn last_recenter(&self) -> Option<SystemTime> {
        self.last_recenter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinged_types::geo::GeoPoint2d;
    use pinged_types::latlon;

    fn at(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
    }

    // One degree of latitude on the 6 371 km sphere is ~111 195 m.
    fn north_of(center: GeoPoint2d, meters: f64) -> LocationFix {
        let d_lat = meters / 111_194.93;
        LocationFix::new(center.lat() + d_lat, center.lon(), SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn close_fix_never_recenters() {
        let center = latlon!(-36.8485, 174.7633);
        let mut policy = RecenterPolicy::default();
        policy.on_recentered(at(0));

        for elapsed in [0, 20_001, 60_000, 3_600_000] {
            assert!(!policy.should_recenter(&center, &north_of(center, 399.0), at(elapsed)));
            assert!(!policy.should_recenter(&center, &north_of(center, 10.0), at(elapsed)));
        }
    }

    #[test]
    fn far_fix_waits_for_interval() {
        let center = latlon!(10.0, 10.0);
        let mut policy = RecenterPolicy::default();
        policy.on_recentered(at(1_000));
        let fix = north_of(center, 500.0);

        assert!(!policy.should_recenter(&center, &fix, at(1_000)));
        assert!(!policy.should_recenter(&center, &fix, at(20_999)));
        assert!(!policy.should_recenter(&center, &fix, at(21_000)));
        assert!(policy.should_recenter(&center, &fix, at(21_001)));
    }

    #[test]
    fn never_recentered_only_checks_distance() {
        let center = latlon!(0.0, 0.0);
        let policy = RecenterPolicy::default();

        assert!(policy.should_recenter(&center, &north_of(center, 401.0), at(0)));
        assert!(!policy.should_recenter(&center, &north_of(center, 300.0), at(0)));
    }

    #[test]
    fn clock_going_backwards_does_not_recenter() {
        let center = latlon!(0.0, 0.0);
        let mut policy = RecenterPolicy::default();
        policy.on_recentered(at(50_000));

        assert!(!policy.should_recenter(&center, &north_of(center, 1_000.0), at(10_000)));
    }
}
