//! Geographic coordinates (latitude and longitude in degrees, see [`GeoPoint`]) and distances on
//! the surface of the Earth.

mod bounds;
mod datum;
mod point;

pub use bounds::GeoBounds;
pub use datum::Datum;
pub use point::{GeoPoint, GeoPoint2d, NewGeoPoint};
