//! Application-level configuration of a [`LiveMap`](crate::LiveMap).
//!
//! The configuration is usually supplied by the host page as a JSON object, so every field has a
//! default value and can be omitted.

use std::collections::BTreeMap;

use pinged_types::geo::{GeoPoint2d, NewGeoPoint};
use serde::{Deserialize, Serialize};

use crate::error::PingedError;
use crate::route::TravelProfile;

/// Basemap style available for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEntry {
    /// Style url understood by the rendering engine.
    pub id: String,
    /// Human readable name. Also used to recognize the style after the engine loads it.
    pub label: String,
}

impl StyleEntry {
    /// Creates a new entry.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Routing service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base url of a Directions v5 compatible service.
    pub base_url: String,
    /// Travel profile used for route requests.
    pub profile: TravelProfile,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com/directions/v5".to_string(),
            profile: TravelProfile::Driving,
        }
    }
}

/// Weather raster overlay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Tile provider. Only `metservice` is supported.
    pub provider: String,
    /// Tile url templates by weather key (`precipitation`, `clouds`, `temp`, `wind`, `pressure`).
    pub tiles: BTreeMap<String, String>,
    /// Key selected when the overlay is first shown.
    pub default_key: String,
    /// Opacity of the overlay in `[0, 1]`.
    pub opacity: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: "metservice".to_string(),
            tiles: BTreeMap::new(),
            default_key: "precipitation".to_string(),
            opacity: 0.6,
        }
    }
}

/// Configuration of the live map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Access token for the basemap and routing services.
    pub access_token: String,
    /// Initial center of the viewport.
    pub default_center: GeoPoint2d,
    /// Initial zoom level.
    pub default_zoom: f64,
    /// The first location fix zooms the map in to at least this level.
    pub first_fix_min_zoom: f64,
    /// Basemap styles. The first one is loaded on start.
    pub styles: Vec<StyleEntry>,
    /// Routing service settings.
    pub routing: RoutingConfig,
    /// Weather overlay settings.
    pub weather: WeatherConfig,
    /// How long a status line stays visible, in milliseconds.
    pub status_duration_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            default_center: GeoPoint2d::latlon(-36.8485, 174.7633),
            default_zoom: 12.5,
            first_fix_min_zoom: 14.0,
            styles: default_styles(),
            routing: RoutingConfig::default(),
            weather: WeatherConfig::default(),
            status_duration_ms: 1800,
        }
    }
}

impl MapConfig {
    /// Parses the configuration from a JSON object. Missing fields get default values.
    pub fn from_json(json: &str) -> Result<Self, PingedError> {
        serde_json::from_str(json).map_err(|err| PingedError::Config(err.to_string()))
    }

    /// Sets the access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// Sets the initial viewport center.
    pub fn with_default_center(mut self, center: GeoPoint2d) -> Self {
        self.default_center = center;
        self
    }

    /// Sets the initial zoom level.
    pub fn with_default_zoom(mut self, zoom: f64) -> Self {
        self.default_zoom = zoom;
        self
    }

    /// Replaces the list of basemap styles.
    pub fn with_styles(mut self, styles: Vec<StyleEntry>) -> Self {
        self.styles = styles;
        self
    }

    /// Sets the routing service settings.
    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    /// Sets the weather overlay settings.
    pub fn with_weather(mut self, weather: WeatherConfig) -> Self {
        self.weather = weather;
        self
    }

    /// Sets how long a status line stays visible.
    pub fn with_status_duration_ms(mut self, duration_ms: u64) -> Self {
        self.status_duration_ms = duration_ms;
        self
    }
}

/// Styles offered by default: Streets, Outdoors, Light, Dark and Satellite.
pub fn default_styles() -> Vec<StyleEntry> {
    vec![
        StyleEntry::new("mapbox://styles/mapbox/streets-v12", "Streets"),
        StyleEntry::new("mapbox://styles/mapbox/outdoors-v12", "Outdoors"),
        StyleEntry::new("mapbox://styles/mapbox/light-v11", "Light"),
        StyleEntry::new("mapbox://styles/mapbox/dark-v11", "Dark"),
        StyleEntry::new("mapbox://styles/mapbox/satellite-streets-v12", "Satellite"),
    ]
}
