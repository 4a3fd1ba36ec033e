//! Pinged is the engine of a live map with personal annotations. It follows the user position,
//! lets the user drop labeled beacons with a long press, draws a route to a destination and
//! keeps a set of optional overlays (terrain, 3D buildings, traffic, weather) on top of any
//! basemap style.
//!
//! # Quick start
//!
//! ```
//! use pinged::engine::HeadlessEngine;
//! use pinged::fix::LocationFix;
//! use pinged::{FixOutcome, LiveMapBuilder, MapConfig};
//! use web_time::SystemTime;
//!
//! let config = MapConfig::default();
//! let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
//!     .with_config(config)
//!     .build()
//!     .expect("map is created");
//!
//! let now = SystemTime::now();
//! let outcome = map.handle_fix(&LocationFix::new(-36.85, 174.76, now), now);
//!
//! assert_eq!(outcome, FixOutcome::FirstFix);
//! assert_eq!(map.status(now), Some("Location acquired"));
//! ```
//!
//! # Main components
//!
//! The [`LiveMap`] does not render anything by itself. It drives a [`RenderEngine`] through a
//! narrow interface and reacts to events delivered by the host:
//!
//! * location updates go through the [`GeoFixFilter`](fix::GeoFixFilter) and the
//!   [`RecenterPolicy`](recenter::RecenterPolicy), which decides when the viewport follows the
//!   user;
//! * pointer events are turned into gestures by the
//!   [`GestureDisambiguator`](control::GestureDisambiguator). A confirmed long press opens the
//!   [`AnnotationFormController`](form::AnnotationFormController), which creates a beacon in the
//!   [`BeaconStore`](beacon::BeaconStore);
//! * the desired set of overlays is kept in [`VisualLayerState`](layer::VisualLayerState) and
//!   applied to the engine by the [`LayerReconciler`](layer::LayerReconciler) every time it
//!   changes or the engine loads a new style;
//! * short feedback messages are shown through the [`StatusChannel`](status::StatusChannel).
//!
//! Everything that talks to the outside world (location sensor, storage, clipboard, routing
//! service, timers) is a trait, so the engine runs the same way in a browser, on a device and in
//! tests.

pub mod beacon;
pub mod clipboard;
mod color;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod fix;
pub mod form;
pub mod geolocation;
pub mod layer;
mod live_map;
pub mod recenter;
pub mod route;
pub mod status;
pub mod style;
pub mod weather;

pub use color::Color;
pub use config::MapConfig;
pub use engine::RenderEngine;
pub use error::PingedError;
pub use live_map::{navigation_url, FixOutcome, LiveMap, LiveMapBuilder, PendingRoute};
pub use pinged_types;
