//! Declarative description of the sources and layers the live map adds to the rendering engine.
//!
//! These types mirror the style document of the engine, so an adapter for a real renderer can
//! serialize them with `serde_json` and pass them over as is.

use std::collections::BTreeMap;

use serde::Serialize;

mod expression;

pub use expression::Expression;

/// Data source of one or more layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceSpec {
    /// Vector tiles.
    Vector {
        /// TileJSON url.
        url: String,
    },
    /// Raster tiles with elevation data.
    RasterDem {
        /// TileJSON url.
        url: String,
        /// Size of a tile in pixels.
        #[serde(rename = "tileSize")]
        tile_size: u32,
        /// Maximum zoom level of the tiles.
        #[serde(rename = "maxzoom")]
        max_zoom: u8,
    },
    /// Raster image tiles.
    Raster {
        /// Tile url templates.
        tiles: Vec<String>,
        /// Size of a tile in pixels.
        #[serde(rename = "tileSize")]
        tile_size: u32,
        /// Attribution shown by the engine.
        #[serde(skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    /// Inline GeoJSON data.
    Geojson {
        /// Features of the source.
        data: geojson::GeoJson,
    },
}

/// Type of a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    /// Solid background.
    Background,
    /// Filled polygons.
    Fill,
    /// Lines.
    Line,
    /// Icons and text labels.
    Symbol,
    /// Extruded polygons.
    FillExtrusion,
    /// Raster tiles.
    Raster,
    /// Sky and atmosphere around a pitched map.
    Sky,
}

/// Visibility of a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Layer is drawn.
    Visible,
    /// Layer is kept in the style but not drawn.
    None,
}

impl Visibility {
    /// Value of the `visibility` layout property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Visible => "visible",
            Visibility::None => "none",
        }
    }
}

impl From<Visibility> for Expression {
    fn from(value: Visibility) -> Self {
        Expression::literal(value.as_str())
    }
}

/// Name of the layout property that controls visibility.
pub const VISIBILITY: &str = "visibility";

/// Style layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    /// Unique id of the layer.
    pub id: String,
    /// Layer type.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Id of the source the layer draws.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Layer of a vector tile source.
    #[serde(rename = "source-layer", skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Zoom level below which the layer is not drawn.
    #[serde(rename = "minzoom", skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    /// Features filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expression>,
    /// Layout properties.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layout: BTreeMap<String, Expression>,
    /// Paint properties.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub paint: BTreeMap<String, Expression>,
}

impl LayerSpec {
    /// Creates a layer without a source and properties.
    pub fn new(id: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            source: None,
            source_layer: None,
            min_zoom: None,
            filter: None,
            layout: BTreeMap::new(),
            paint: BTreeMap::new(),
        }
    }

    /// Sets the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the layer of the vector tile source.
    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    /// Sets the minimum zoom.
    pub fn with_min_zoom(mut self, min_zoom: f64) -> Self {
        self.min_zoom = Some(min_zoom);
        self
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets a layout property.
    pub fn with_layout(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.layout.insert(name.into(), value.into());
        self
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.paint.insert(name.into(), value.into());
        self
    }

    /// Visibility of the layer. Layers without the `visibility` property are visible.
    pub fn visibility(&self) -> Visibility {
        match self.layout.get(VISIBILITY) {
            Some(Expression::Literal(value)) if *value == "none" => Visibility::None,
            _ => Visibility::Visible,
        }
    }

    /// Whether this is a symbol layer that draws text labels.
    pub fn is_label(&self) -> bool {
        self.kind == LayerKind::Symbol && self.layout.contains_key("text-field")
    }
}

/// Elevation applied to the whole map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainSpec {
    /// Id of a `raster-dem` source.
    pub source: String,
    /// Multiplier of the elevation values.
    pub exaggeration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_visibility() {
        let layer = LayerSpec::new("a", LayerKind::Line);
        assert_eq!(layer.visibility(), Visibility::Visible);

        let layer = layer.with_layout(VISIBILITY, Visibility::None);
        assert_eq!(layer.visibility(), Visibility::None);

        let layer = layer.with_layout(VISIBILITY, Visibility::Visible);
        assert_eq!(layer.visibility(), Visibility::Visible);
    }

    #[test]
    fn label_layers() {
        let icons = LayerSpec::new("poi-icons", LayerKind::Symbol);
        assert!(!icons.is_label());

        let labels = icons.with_layout("text-field", Expression::get("name"));
        assert!(labels.is_label());
    }

    #[test]
    fn serialize_specs() {
        let source = SourceSpec::Raster {
            tiles: vec!["https://tiles/{z}/{x}/{y}.png".into()],
            tile_size: 256,
            attribution: None,
        };
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({"type": "raster", "tiles": ["https://tiles/{z}/{x}/{y}.png"], "tileSize": 256})
        );

        let layer = LayerSpec::new("buildings", LayerKind::FillExtrusion)
            .with_source("composite")
            .with_source_layer("building")
            .with_min_zoom(14.0)
            .with_paint("fill-extrusion-opacity", 0.6);
        assert_eq!(
            serde_json::to_value(&layer).unwrap(),
            json!({
                "id": "buildings",
                "type": "fill-extrusion",
                "source": "composite",
                "source-layer": "building",
                "minzoom": 14.0,
                "paint": {"fill-extrusion-opacity": 0.6},
            })
        );
    }
}
