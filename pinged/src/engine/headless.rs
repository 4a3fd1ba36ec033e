use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use log::debug;
use pinged_types::geo::{GeoBounds, GeoPoint, GeoPoint2d, NewGeoPoint};
use pinged_types::screen::{ScreenPoint, Size};

use crate::config::StyleEntry;
use crate::engine::{
    Camera, CameraUpdate, MarkerKey, MarkerSpec, PopupContent, PopupId, PopupSpec, RenderEngine,
};
use crate::error::EngineError;
use crate::style::{Expression, LayerKind, LayerSpec, SourceSpec, TerrainSpec};

const TILE_SIZE: f64 = 512.0;
const MAX_ZOOM: f64 = 22.0;
const MARKER_HIT_RADIUS: f64 = 12.0;

/// Basemap style known to the [`HeadlessEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    /// Url the style is loaded by.
    pub url: String,
    /// Name reported after the style is loaded.
    pub name: String,
    /// Sources of the basemap.
    pub sources: Vec<(String, SourceSpec)>,
    /// Layers of the basemap from the bottom to the top.
    pub layers: Vec<LayerSpec>,
}

impl StyleSheet {
    /// Creates a style without sources and layers.
    pub fn empty(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            sources: vec![],
            layers: vec![],
        }
    }

    /// A street basemap with a vector `composite` source: background, water, roads and two label
    /// layers on top.
    pub fn basemap(entry: &StyleEntry) -> Self {
        let composite = "composite";
        Self {
            url: entry.id.clone(),
            name: format!("Mapbox {}", entry.label),
            sources: vec![(
                composite.to_string(),
                SourceSpec::Vector {
                    url: "mapbox://mapbox.mapbox-streets-v8".to_string(),
                },
            )],
            layers: vec![
                LayerSpec::new("background", LayerKind::Background),
                LayerSpec::new("water", LayerKind::Fill)
                    .with_source(composite)
                    .with_source_layer("water"),
                LayerSpec::new("road", LayerKind::Line)
                    .with_source(composite)
                    .with_source_layer("road"),
                LayerSpec::new("road-shields", LayerKind::Symbol)
                    .with_source(composite)
                    .with_source_layer("road")
                    .with_layout("icon-image", Expression::get("shield")),
                LayerSpec::new("poi-label", LayerKind::Symbol)
                    .with_source(composite)
                    .with_source_layer("poi_label")
                    .with_layout("text-field", Expression::get("name")),
                LayerSpec::new("place-label", LayerKind::Symbol)
                    .with_source(composite)
                    .with_source_layer("place_label")
                    .with_layout("text-field", Expression::get("name")),
            ],
        }
    }
}

/// In-memory rendering engine.
///
/// Keeps the whole style state the way a real engine would, including the teardown of custom
/// sources and layers on style load, but draws nothing. Projection is spherical web mercator with
/// 512 px tiles, without pitch or rotation. Styles load synchronously.
///
/// Used by tests and by hosts that run the live map without a display.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    catalogue: HashMap<String, StyleSheet>,
    style_name: Option<String>,
    sources: BTreeMap<String, SourceSpec>,
    layers: Vec<LayerSpec>,
    terrain: Option<TerrainSpec>,
    camera: Camera,
    size: Size,
    markers: Vec<(MarkerKey, MarkerSpec)>,
    popups: BTreeMap<u64, PopupSpec>,
    next_popup_id: u64,
    mutations: usize,
    style_loads: usize,
}

impl HeadlessEngine {
    /// Creates an engine with the given viewport size and camera, with no known styles.
    pub fn new(size: Size, camera: Camera) -> Self {
        Self {
            catalogue: HashMap::new(),
            style_name: None,
            sources: BTreeMap::new(),
            layers: vec![],
            terrain: None,
            camera,
            size,
            markers: vec![],
            popups: BTreeMap::new(),
            next_popup_id: 0,
            mutations: 0,
            style_loads: 0,
        }
    }

    /// Creates an 800x600 engine that knows a [`StyleSheet::basemap`] for each of the entries.
    pub fn with_basemaps(styles: &[StyleEntry]) -> Self {
        let camera = Camera {
            center: GeoPoint2d::latlon(0.0, 0.0),
            zoom: 1.0,
            pitch: 0.0,
            bearing: 0.0,
        };
        let mut engine = Self::new(Size::new(800.0, 600.0), camera);
        for entry in styles {
            engine.register_style(StyleSheet::basemap(entry));
        }

        engine
    }

    /// Makes the style available for loading.
    pub fn register_style(&mut self, style: StyleSheet) {
        self.catalogue.insert(style.url.clone(), style);
    }

    /// Size of the viewport.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Number of successful mutations of sources, layers and terrain since the engine was
    /// created. Style loads are not counted.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Number of styles loaded since the engine was created.
    pub fn style_load_count(&self) -> usize {
        self.style_loads
    }

    /// Ids of all sources, sorted.
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// Ids of all layers from the bottom to the top.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    /// Marker with the given key.
    pub fn marker(&self, key: &MarkerKey) -> Option<&MarkerSpec> {
        self.markers.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    /// Number of markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Open popups in the order they were opened.
    pub fn open_popups(&self) -> Vec<(PopupId, &PopupSpec)> {
        self.popups
            .iter()
            .map(|(id, popup)| (PopupId(*id), popup))
            .collect()
    }

    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn insert_index(&self, before: Option<&str>) -> Result<usize, EngineError> {
        match before {
            Some(before) => self
                .layer_index(before)
                .ok_or_else(|| EngineError::UnknownLayer(before.to_string())),
            None => Ok(self.layers.len()),
        }
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerSpec, EngineError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.camera.zoom)
    }
}

/// Normalized web mercator coordinates in `[0, 1]`, with `y` growing to the south.
fn mercator(point: &impl GeoPoint<Num = f64>) -> (f64, f64) {
    let x = (point.lon() + 180.0) / 360.0;
    let y = (1.0 - (PI / 4.0 + point.lat_rad() / 2.0).tan().ln() / PI) / 2.0;
    (x, y)
}

fn inverse_mercator(x: f64, y: f64) -> Option<GeoPoint2d> {
    if !(0.0..=1.0).contains(&y) {
        return None;
    }

    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    let lon = (x * 360.0).rem_euclid(360.0) - 180.0;
    Some(GeoPoint2d::latlon(lat, lon))
}

impl RenderEngine for HeadlessEngine {
    fn load_style(&mut self, url: &str) -> Result<(), EngineError> {
        let style = self
            .catalogue
            .get(url)
            .ok_or_else(|| EngineError::UnknownStyle(url.to_string()))?;

        self.style_name = Some(style.name.clone());
        self.sources = style.sources.iter().cloned().collect();
        self.layers = style.layers.clone();
        self.terrain = None;
        self.style_loads += 1;

        debug!("Loaded style {url}");
        Ok(())
    }

    fn style_name(&self) -> Option<&str> {
        self.style_name.as_deref()
    }

    fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError> {
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }

        self.sources.insert(id.to_string(), source);
        self.mutations += 1;
        Ok(())
    }

    fn update_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError> {
        let existing = self
            .sources
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        *existing = source;
        self.mutations += 1;
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        if self
            .layers
            .iter()
            .any(|l| l.source.as_deref() == Some(id))
        {
            return Err(EngineError::SourceInUse(id.to_string()));
        }

        self.sources
            .remove(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        if self.terrain.as_ref().is_some_and(|t| t.source == id) {
            self.terrain = None;
        }

        self.mutations += 1;
        Ok(())
    }

    fn layers(&self) -> Vec<&LayerSpec> {
        self.layers.iter().collect()
    }

    fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError> {
        if self.has_layer(&layer.id) {
            return Err(EngineError::DuplicateLayer(layer.id));
        }
        if let Some(source) = &layer.source {
            if !self.sources.contains_key(source) {
                return Err(EngineError::UnknownSource(source.clone()));
            }
        }

        let index = self.insert_index(before)?;
        self.layers.insert(index, layer);
        self.mutations += 1;
        Ok(())
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), EngineError> {
        let from = self
            .layer_index(id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))?;
        if before == Some(id) {
            return Ok(());
        }

        // Validate the target before taking the layer out.
        self.insert_index(before)?;
        let layer = self.layers.remove(from);
        let index = self.insert_index(before)?;
        self.layers.insert(index, layer);
        self.mutations += 1;
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let index = self
            .layer_index(id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))?;
        self.layers.remove(index);
        self.mutations += 1;
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        layer: &str,
        name: &str,
        value: Expression,
    ) -> Result<(), EngineError> {
        self.layer_mut(layer)?.layout.insert(name.to_string(), value);
        self.mutations += 1;
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        name: &str,
        value: Expression,
    ) -> Result<(), EngineError> {
        self.layer_mut(layer)?.paint.insert(name.to_string(), value);
        self.mutations += 1;
        Ok(())
    }

    fn terrain(&self) -> Option<&TerrainSpec> {
        self.terrain.as_ref()
    }

    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError> {
        if let Some(terrain) = &terrain {
            if !self.sources.contains_key(&terrain.source) {
                return Err(EngineError::UnknownSource(terrain.source.clone()));
            }
        }

        self.terrain = terrain;
        self.mutations += 1;
        Ok(())
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn ease_to(&mut self, update: CameraUpdate) {
        let mut camera = update.apply(self.camera);
        camera.zoom = camera.zoom.clamp(0.0, MAX_ZOOM);
        self.camera = camera;
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, padding: f64) {
        let (west, north) = mercator(&GeoPoint2d::latlon(bounds.north, bounds.west));
        let (east, south) = mercator(&GeoPoint2d::latlon(bounds.south, bounds.east));

        let center = inverse_mercator((west + east) / 2.0, (north + south) / 2.0)
            .unwrap_or_else(|| bounds.center());

        let available_width = (self.size.width() - 2.0 * padding).max(1.0);
        let available_height = (self.size.height() - 2.0 * padding).max(1.0);
        let width = east - west;
        let height = south - north;

        let zoom = if width > 0.0 || height > 0.0 {
            let scale_x = if width > 0.0 {
                available_width / width
            } else {
                f64::INFINITY
            };
            let scale_y = if height > 0.0 {
                available_height / height
            } else {
                f64::INFINITY
            };
            (scale_x.min(scale_y) / TILE_SIZE).log2().clamp(0.0, MAX_ZOOM)
        } else {
            self.camera.zoom
        };

        self.camera.center = center;
        self.camera.zoom = zoom;
    }

    fn project(&self, point: &GeoPoint2d) -> ScreenPoint {
        let world = self.world_size();
        let (x, y) = mercator(point);
        let (cx, cy) = mercator(&self.camera.center);

        ScreenPoint::new(
            (x - cx) * world + self.size.half_width(),
            (y - cy) * world + self.size.half_height(),
        )
    }

    fn unproject(&self, point: &ScreenPoint) -> Option<GeoPoint2d> {
        let world = self.world_size();
        let (cx, cy) = mercator(&self.camera.center);

        inverse_mercator(
            cx + (point.x - self.size.half_width()) / world,
            cy + (point.y - self.size.half_height()) / world,
        )
    }

    fn marker_at(&self, point: &ScreenPoint) -> Option<MarkerKey> {
        self.markers
            .iter()
            .rev()
            .find(|(_, marker)| {
                let position = self.project(&marker.position);
                (position - *point).norm() <= MARKER_HIT_RADIUS
            })
            .map(|(key, _)| key.clone())
    }

    fn has_marker(&self, key: &MarkerKey) -> bool {
        self.marker(key).is_some()
    }

    fn add_marker(&mut self, key: MarkerKey, marker: MarkerSpec) {
        self.remove_marker(&key);
        self.markers.push((key, marker));
    }

    fn set_marker_position(
        &mut self,
        key: &MarkerKey,
        position: GeoPoint2d,
    ) -> Result<(), EngineError> {
        let (_, marker) = self
            .markers
            .iter_mut()
            .find(|(k, _)| k == key)
            .ok_or_else(|| EngineError::UnknownMarker(format!("{key:?}")))?;
        marker.position = position;
        Ok(())
    }

    fn remove_marker(&mut self, key: &MarkerKey) {
        self.markers.retain(|(k, _)| k != key);
    }

    fn open_popup(&mut self, popup: PopupSpec) -> PopupId {
        self.next_popup_id += 1;
        self.popups.insert(self.next_popup_id, popup);
        PopupId(self.next_popup_id)
    }

    fn update_popup(&mut self, id: PopupId, content: PopupContent) -> Result<(), EngineError> {
        let popup = self
            .popups
            .get_mut(&id.0)
            .ok_or(EngineError::UnknownPopup(id.0))?;
        popup.content = content;
        Ok(())
    }

    fn close_popup(&mut self, id: PopupId) {
        self.popups.remove(&id.0);
    }
}
