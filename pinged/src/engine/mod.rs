//! Interface of the map rendering engine the live map drives.
//!
//! The engine owns the basemap style, custom sources and layers, markers, popups and the camera.
//! Loading a new style drops every source and layer added on top of the previous one, while
//! markers and popups survive: this is the behavior the [`LayerReconciler`](crate::layer::LayerReconciler)
//! is built around.

use std::time::Duration;

use pinged_types::geo::{GeoBounds, GeoPoint2d};
use pinged_types::screen::ScreenPoint;

use crate::beacon::BeaconId;
use crate::error::EngineError;
use crate::style::{Expression, LayerSpec, SourceSpec, TerrainSpec};

mod headless;

pub use headless::{HeadlessEngine, StyleSheet};

/// Identifies a marker managed by the live map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    /// Current position of the user.
    Puck,
    /// Destination selected by the user.
    Destination,
    /// A stored beacon.
    Beacon(BeaconId),
}

/// Which point of the marker element is placed at the marker position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MarkerAnchor {
    /// Center of the element.
    #[default]
    Center,
    /// Middle of the bottom edge, for pin-like markers.
    Bottom,
}

/// Marker drawn on top of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Geographic position.
    pub position: GeoPoint2d,
    /// Class of the marker element, used by the host to choose its look.
    pub class_name: String,
    /// Tooltip.
    pub title: Option<String>,
    /// Anchor of the element.
    pub anchor: MarkerAnchor,
}

impl MarkerSpec {
    /// Creates a centered marker without a title.
    pub fn new(position: GeoPoint2d, class_name: impl Into<String>) -> Self {
        Self {
            position,
            class_name: class_name.into(),
            title: None,
            anchor: MarkerAnchor::Center,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the anchor.
    pub fn with_anchor(mut self, anchor: MarkerAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Content of a popup.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupContent {
    /// Read-only information.
    Info {
        /// Heading.
        title: String,
        /// Text lines under the heading.
        lines: Vec<String>,
        /// External link.
        link: Option<String>,
    },
    /// Single-line text input of the annotation form.
    LabelInput {
        /// Hint shown in the empty input.
        placeholder: String,
        /// Current text.
        value: String,
    },
}

/// Popup anchored at a geographic position.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupSpec {
    /// Anchor position.
    pub position: GeoPoint2d,
    /// Content.
    pub content: PopupContent,
}

/// Handle of an open popup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PopupId(pub u64);

/// Position of the camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    /// Geographic point in the center of the viewport.
    pub center: GeoPoint2d,
    /// Zoom level.
    pub zoom: f64,
    /// Tilt from the nadir in degrees.
    pub pitch: f64,
    /// Rotation from the north in degrees.
    pub bearing: f64,
}

/// Camera animation target. Fields that are not set keep their current values.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CameraUpdate {
    /// New center.
    pub center: Option<GeoPoint2d>,
    /// New zoom.
    pub zoom: Option<f64>,
    /// New pitch.
    pub pitch: Option<f64>,
    /// New bearing.
    pub bearing: Option<f64>,
    /// Duration of the animation.
    pub duration: Duration,
}

impl CameraUpdate {
    /// Moves the center.
    pub fn center(center: GeoPoint2d) -> Self {
        Self {
            center: Some(center),
            ..Default::default()
        }
    }

    /// Changes the pitch.
    pub fn pitch(pitch: f64) -> Self {
        Self {
            pitch: Some(pitch),
            ..Default::default()
        }
    }

    /// Sets the zoom.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Sets the animation duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Camera after the update is applied.
    pub fn apply(&self, camera: Camera) -> Camera {
        Camera {
            center: self.center.unwrap_or(camera.center),
            zoom: self.zoom.unwrap_or(camera.zoom),
            pitch: self.pitch.unwrap_or(camera.pitch),
            bearing: self.bearing.unwrap_or(camera.bearing),
        }
    }
}

/// Map rendering engine.
///
/// Mutating methods fail only when the request does not make sense for the current style, e.g.
/// adding a source that already exists. Callers are expected to query the state before mutating
/// it.
pub trait RenderEngine {
    /// Starts loading a basemap style. All custom sources, layers and the terrain are dropped.
    /// The host must call [`LiveMap::style_loaded`](crate::LiveMap::style_loaded) once the style
    /// is ready.
    fn load_style(&mut self, url: &str) -> Result<(), EngineError>;
    /// Human readable name of the loaded style.
    fn style_name(&self) -> Option<&str>;

    /// Source with the given id.
    fn source(&self, id: &str) -> Option<&SourceSpec>;
    /// Whether the source exists.
    fn has_source(&self, id: &str) -> bool {
        self.source(id).is_some()
    }
    /// Adds a new source.
    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError>;
    /// Replaces the data of an existing source, keeping the layers that draw it.
    fn update_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError>;
    /// Removes a source. Layers drawing it must be removed first.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// All layers of the style, from the bottom to the top.
    fn layers(&self) -> Vec<&LayerSpec>;
    /// Layer with the given id.
    fn layer(&self, id: &str) -> Option<&LayerSpec>;
    /// Whether the layer exists.
    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }
    /// Adds a layer below the `before` layer, or on top of all layers.
    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError>;
    /// Moves a layer below the `before` layer, or on top of all layers.
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), EngineError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Sets a layout property of a layer.
    fn set_layout_property(
        &mut self,
        layer: &str,
        name: &str,
        value: Expression,
    ) -> Result<(), EngineError>;
    /// Sets a paint property of a layer.
    fn set_paint_property(
        &mut self,
        layer: &str,
        name: &str,
        value: Expression,
    ) -> Result<(), EngineError>;

    /// Active terrain.
    fn terrain(&self) -> Option<&TerrainSpec>;
    /// Sets or detaches the terrain. The source must exist.
    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError>;

    /// Current camera.
    fn camera(&self) -> Camera;
    /// Animates the camera.
    fn ease_to(&mut self, update: CameraUpdate);
    /// Moves the camera so that the bounds fit into the viewport with the padding in pixels.
    fn fit_bounds(&mut self, bounds: GeoBounds, padding: f64);
    /// Screen position of a geographic point.
    fn project(&self, point: &GeoPoint2d) -> ScreenPoint;
    /// Geographic point at a screen position, if the position is on the map.
    fn unproject(&self, point: &ScreenPoint) -> Option<GeoPoint2d>;

    /// Top-most marker under the screen position.
    fn marker_at(&self, point: &ScreenPoint) -> Option<MarkerKey>;
    /// Whether the marker exists.
    fn has_marker(&self, key: &MarkerKey) -> bool;
    /// Adds a marker, replacing an existing marker with the same key.
    fn add_marker(&mut self, key: MarkerKey, marker: MarkerSpec);
    /// Moves an existing marker.
    fn set_marker_position(
        &mut self,
        key: &MarkerKey,
        position: GeoPoint2d,
    ) -> Result<(), EngineError>;
    /// Removes a marker. Does nothing if the marker does not exist.
    fn remove_marker(&mut self, key: &MarkerKey);

    /// Opens a popup.
    fn open_popup(&mut self, popup: PopupSpec) -> PopupId;
    /// Updates the content of an open popup.
    fn update_popup(&mut self, id: PopupId, content: PopupContent) -> Result<(), EngineError>;
    /// Closes a popup. Does nothing if the popup is already closed.
    fn close_popup(&mut self, id: PopupId);
}
