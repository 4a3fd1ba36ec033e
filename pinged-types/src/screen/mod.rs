//! Screen-space coordinates: pixels from the top-left corner of the map surface.

mod size;

pub use nalgebra::{Point2, Vector2};
pub use size::Size;

/// Pointer position on the screen in pixels.
pub type ScreenPoint = Point2<f64>;
/// Displacement between two screen points in pixels.
pub type ScreenVector = Vector2<f64>;

/// Returns true if `current` is further than `threshold` pixels away from `origin` along either
/// of the axes.
pub fn exceeds_axis_threshold(origin: &ScreenPoint, current: &ScreenPoint, threshold: f64) -> bool {
    let delta: ScreenVector = current - origin;
    delta.x.abs() > threshold || delta.y.abs() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_threshold_is_checked_per_axis() {
        let origin = ScreenPoint::new(100.0, 100.0);

        assert!(!exceeds_axis_threshold(&origin, &ScreenPoint::new(106.0, 94.0), 6.0));
        assert!(exceeds_axis_threshold(&origin, &ScreenPoint::new(108.0, 100.0), 6.0));
        assert!(exceeds_axis_threshold(&origin, &ScreenPoint::new(100.0, 93.5), 6.0));
        // 5 px in both axes is ~7 px in euclidean distance, but still within the threshold
        assert!(!exceeds_axis_threshold(&origin, &ScreenPoint::new(105.0, 105.0), 6.0));
    }
}
