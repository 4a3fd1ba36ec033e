//! Desired visual state of the map and its reconciliation with the rendering engine.

use crate::route::RouteGeometry;

mod definitions;
mod reconciler;

pub use definitions::*;
pub use reconciler::{LayerReconciler, ReconcileReport, ReconcilerConfig};

/// Ids of the sources and layers managed by the live map.
pub mod ids {
    /// Elevation source of the terrain.
    pub const TERRAIN_SOURCE: &str = "pinged-dem";
    /// Sky around the pitched map.
    pub const SKY_LAYER: &str = "pinged-sky";
    /// Vector source with the buildings, provided by the basemap style.
    pub const BUILDINGS_SOURCE: &str = "composite";
    /// Extruded buildings.
    pub const BUILDINGS_LAYER: &str = "pinged-3d-buildings";
    /// Live traffic vector source.
    pub const TRAFFIC_SOURCE: &str = "mapbox-traffic";
    /// Traffic congestion lines.
    pub const TRAFFIC_LAYER: &str = "pinged-traffic";
    /// Weather raster source.
    pub const WEATHER_SOURCE: &str = "pinged-weather";
    /// Weather raster layer.
    pub const WEATHER_LAYER: &str = "pinged-weather-layer";
    /// Route line source.
    pub const ROUTE_SOURCE: &str = "pinged-route";
    /// Route line.
    pub const ROUTE_LAYER: &str = "pinged-route-line";

    /// Layers added on top of the basemap style.
    pub const OVERLAY_LAYERS: [&str; 5] = [
        SKY_LAYER,
        BUILDINGS_LAYER,
        TRAFFIC_LAYER,
        WEATHER_LAYER,
        ROUTE_LAYER,
    ];
}

/// Weather overlay selected for display.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSelection {
    /// Weather key, e.g. `precipitation`.
    pub key: String,
    /// Tile url template, including the cache buster.
    pub tiles_url: String,
    /// Opacity of the raster.
    pub opacity: f64,
}

/// What the map should look like, independently of what the engine currently shows.
///
/// Only explicit user actions change this value. The [`LayerReconciler`] brings the engine in
/// line with it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualLayerState {
    /// Index of the basemap style in the style catalogue.
    pub style_index: usize,
    /// Elevation and sky.
    pub terrain_on: bool,
    /// Extruded buildings.
    pub buildings_3d_on: bool,
    /// Live traffic lines.
    pub traffic_on: bool,
    /// Route to show.
    pub active_route: Option<RouteGeometry>,
    /// Weather raster to show.
    pub weather: Option<WeatherSelection>,
}
