//! Geometric primitives shared by the `pinged` live map engine.
//!
//! Two coordinate spaces are used by the engine:
//! * geographic coordinates (see [`geo`]) - latitude and longitude in degrees, with distances
//!   measured along great circles of a spherical [`Datum`](geo::Datum);
//! * screen coordinates (see [`screen`]) - pixels from the top-left corner of the map surface.

extern crate self as pinged_types;

pub mod error;
pub mod geo;
pub mod screen;
