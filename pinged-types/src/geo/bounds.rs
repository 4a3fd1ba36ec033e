use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, GeoPoint2d, NewGeoPoint};

/// Rectangle in geographic coordinates. Bounds crossing the antimeridian are not supported.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Minimum latitude.
    pub south: f64,
    /// Minimum longitude.
    pub west: f64,
    /// Maximum latitude.
    pub north: f64,
    /// Maximum longitude.
    pub east: f64,
}

impl GeoBounds {
    /// Bounds containing a single point.
    pub fn from_point(p: &impl GeoPoint<Num = f64>) -> Self {
        Self {
            south: p.lat(),
            west: p.lon(),
            north: p.lat(),
            east: p.lon(),
        }
    }

    /// Smallest bounds containing all the points. Returns `None` if the iterator is empty.
    pub fn from_points<'a, P: GeoPoint<Num = f64> + 'a>(
        mut points: impl Iterator<Item = &'a P>,
    ) -> Option<Self> {
        let first = points.next()?;
        let mut bounds = Self::from_point(first);
        for p in points {
            bounds.extend(p);
        }

        Some(bounds)
    }

    /// Grows the bounds to contain the point.
    pub fn extend(&mut self, p: &impl GeoPoint<Num = f64>) {
        self.south = self.south.min(p.lat());
        self.north = self.north.max(p.lat());
        self.west = self.west.min(p.lon());
        self.east = self.east.max(p.lon());
    }

    /// Returns true if the point is inside the bounds (borders included).
    pub fn contains(&self, p: &impl GeoPoint<Num = f64>) -> bool {
        self.south <= p.lat() && self.north >= p.lat() && self.west <= p.lon() && self.east >= p.lon()
    }

    /// Center point of the bounds.
    pub fn center(&self) -> GeoPoint2d {
        GeoPoint2d::latlon(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}
