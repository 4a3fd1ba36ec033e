use approx::AbsDiffEq;
use num_traits::{Float, NumCast, One};
use serde::{Deserialize, Serialize};

use crate::error::PingedTypesError;
use crate::geo::Datum;

/// A point on the surface of the Earth.
pub trait GeoPoint {
    /// Numeric type used to represent coordinates.
    type Num: Float;

    /// Latitude in degrees.
    fn lat(&self) -> Self::Num;
    /// Longitude in degrees.
    fn lon(&self) -> Self::Num;

    /// Latitude in radians.
    fn lat_rad(&self) -> Self::Num {
        self.lat().to_radians()
    }

    /// Longitude in radians.
    fn lon_rad(&self) -> Self::Num {
        self.lon().to_radians()
    }

    /// Returns true if both coordinates are finite, latitude is in `[-90, 90]` and longitude is in
    /// `[-180, 180]`.
    fn is_valid(&self) -> bool {
        let (Some(max_lat), Some(max_lon)) = (
            <Self::Num as NumCast>::from(90.0),
            <Self::Num as NumCast>::from(180.0),
        ) else {
            return false;
        };

        self.lat().is_finite()
            && self.lon().is_finite()
            && self.lat().abs() <= max_lat
            && self.lon().abs() <= max_lon
    }

    /// Great-circle distance to `other` in meters, calculated with the haversine formula over a
    /// sphere with the radius of the datum.
    fn distance(&self, other: &impl GeoPoint<Num = Self::Num>, datum: &Datum) -> Self::Num {
        let one = Self::Num::one();
        let two = one + one;
        let half_d_lat = (other.lat_rad() - self.lat_rad()) / two;
        let half_d_lon = (other.lon_rad() - self.lon_rad()) / two;

        let a = half_d_lat.sin().powi(2)
            + self.lat_rad().cos() * other.lat_rad().cos() * half_d_lon.sin().powi(2);
        let c = two * a.sqrt().min(one).asin();

        let radius = <Self::Num as NumCast>::from(datum.radius()).unwrap_or_else(Self::Num::nan);
        radius * c
    }
}

/// Geographic point that can be constructed from coordinates.
pub trait NewGeoPoint<N = f64>: GeoPoint<Num = N> + Sized {
    /// Creates a point from latitude and longitude.
    fn latlon(lat: N, lon: N) -> Self;
    /// Creates a point from longitude and latitude.
    fn lonlat(lon: N, lat: N) -> Self {
        Self::latlon(lat, lon)
    }
}

/// 2d point on the surface of the Earth.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct GeoPoint2d {
    lat: f64,
    lon: f64,
}

impl GeoPoint for GeoPoint2d {
    type Num = f64;

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl NewGeoPoint<f64> for GeoPoint2d {
    fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl GeoPoint2d {
    /// Creates a new point from another one.
    pub fn from(other: &impl GeoPoint<Num = f64>) -> Self {
        Self {
            lat: other.lat(),
            lon: other.lon(),
        }
    }

    /// Creates a point, checking that the coordinates are valid (see [`GeoPoint::is_valid`]).
    pub fn try_latlon(lat: f64, lon: f64) -> Result<Self, PingedTypesError> {
        let point = Self { lat, lon };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(PingedTypesError::InvalidCoordinate { lat, lon })
        }
    }

    /// Coordinates as a `[lon, lat]` pair, the order used by GeoJSON and routing services.
    pub fn lonlat_array(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl AbsDiffEq for GeoPoint2d {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lat.abs_diff_eq(&other.lat, epsilon) && self.lon.abs_diff_eq(&other.lon, epsilon)
    }
}

/// Creates a new [`GeoPoint2d`] from latitude and longitude values (in degrees).
///
/// ```
/// use pinged_types::geo::GeoPoint;
/// use pinged_types::latlon;
///
/// let point = latlon!(38.0, 52.0);
/// assert_eq!(point.lat(), 38.0);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        <::pinged_types::geo::GeoPoint2d as ::pinged_types::geo::NewGeoPoint<f64>>::latlon(
            $lat, $lon,
        )
    };
}
