//! Sources and layers of the overlays.

use serde_json::json;

use crate::color::Color;
use crate::layer::ids;
use crate::layer::{ReconcilerConfig, WeatherSelection};
use crate::route::RouteGeometry;
use crate::style::{Expression, LayerKind, LayerSpec, SourceSpec, TerrainSpec};

/// Elevation tiles of the terrain.
pub fn terrain_source() -> SourceSpec {
    SourceSpec::RasterDem {
        url: "mapbox://mapbox.mapbox-terrain-dem-v1".to_string(),
        tile_size: 512,
        max_zoom: 14,
    }
}

/// Terrain attached to the elevation source.
pub fn terrain(config: &ReconcilerConfig) -> TerrainSpec {
    TerrainSpec {
        source: ids::TERRAIN_SOURCE.to_string(),
        exaggeration: config.terrain_exaggeration(),
    }
}

/// Atmosphere around a pitched map.
pub fn sky_layer() -> LayerSpec {
    LayerSpec::new(ids::SKY_LAYER, LayerKind::Sky)
        .with_paint("sky-type", "atmosphere")
        .with_paint("sky-atmosphere-sun", Expression::literal(json!([0.0, 0.0])))
        .with_paint("sky-atmosphere-sun-intensity", 15.0)
}

/// Extruded buildings of the basemap `building` layer.
///
/// Buildings grow from the ground just above the minimum zoom, so they don't pop up abruptly.
/// Features without a height get the fallback height.
pub fn buildings_layer(config: &ReconcilerConfig) -> LayerSpec {
    let min_zoom = config.buildings_min_zoom();
    let grown_zoom = min_zoom + 0.05;

    LayerSpec::new(ids::BUILDINGS_LAYER, LayerKind::FillExtrusion)
        .with_source(ids::BUILDINGS_SOURCE)
        .with_source_layer("building")
        .with_filter(Expression::equals(Expression::get("extrude"), "true".into()))
        .with_min_zoom(min_zoom)
        .with_paint("fill-extrusion-color", Color::GRAY.to_css().as_str())
        .with_paint(
            "fill-extrusion-height",
            Expression::zoom_interpolate([
                (min_zoom, 0.0.into()),
                (
                    grown_zoom,
                    Expression::get_or("height", config.buildings_fallback_height()),
                ),
            ]),
        )
        .with_paint(
            "fill-extrusion-base",
            Expression::zoom_interpolate([
                (min_zoom, 0.0.into()),
                (grown_zoom, Expression::get_or("min_height", 0.0)),
            ]),
        )
        .with_paint("fill-extrusion-opacity", 0.6)
}

/// Mapbox Traffic v1 tiles.
pub fn traffic_source() -> SourceSpec {
    SourceSpec::Vector {
        url: "mapbox://mapbox.mapbox-traffic-v1".to_string(),
    }
}

/// Congestion color of a traffic segment. Segments without congestion data are drawn in gray.
pub fn congestion_color() -> Expression {
    let palette = [
        ("low", Color::TRAFFIC_LOW),
        ("moderate", Color::TRAFFIC_MODERATE),
        ("heavy", Color::TRAFFIC_HEAVY),
        ("severe", Color::TRAFFIC_SEVERE),
    ];

    Expression::match_value(
        Expression::get_or("congestion", "unknown"),
        palette
            .into_iter()
            .map(|(level, color)| (json!(level), color.to_css().as_str().into())),
        Color::TRAFFIC_UNKNOWN.to_css().as_str().into(),
    )
}

/// Line width of the traffic and route lines.
pub fn line_width() -> Expression {
    Expression::zoom_interpolate([
        (5.0, 0.8.into()),
        (10.0, 2.0.into()),
        (12.0, 3.0.into()),
        (16.0, 6.0.into()),
    ])
}

/// Traffic congestion lines.
pub fn traffic_layer() -> LayerSpec {
    LayerSpec::new(ids::TRAFFIC_LAYER, LayerKind::Line)
        .with_source(ids::TRAFFIC_SOURCE)
        .with_source_layer("traffic")
        .with_min_zoom(0.0)
        .with_layout("line-cap", "round")
        .with_layout("line-join", "round")
        .with_paint("line-color", congestion_color())
        .with_paint("line-width", line_width())
        .with_paint("line-opacity", 0.95)
}

/// Raster tiles of the selected weather overlay.
pub fn weather_source(selection: &WeatherSelection) -> SourceSpec {
    SourceSpec::Raster {
        tiles: vec![selection.tiles_url.clone()],
        tile_size: 256,
        attribution: Some("© MetService".to_string()),
    }
}

/// Weather raster layer.
pub fn weather_layer(selection: &WeatherSelection) -> LayerSpec {
    LayerSpec::new(ids::WEATHER_LAYER, LayerKind::Raster)
        .with_source(ids::WEATHER_SOURCE)
        .with_paint("raster-opacity", selection.opacity)
}

/// GeoJSON source with the route line.
pub fn route_source(route: &RouteGeometry) -> SourceSpec {
    SourceSpec::Geojson {
        data: route.to_geojson(),
    }
}

/// Route line.
pub fn route_layer() -> LayerSpec {
    LayerSpec::new(ids::ROUTE_LAYER, LayerKind::Line)
        .with_source(ids::ROUTE_SOURCE)
        .with_layout("line-cap", "round")
        .with_layout("line-join", "round")
        .with_paint("line-color", Color::ROUTE.to_css().as_str())
        .with_paint(
            "line-width",
            Expression::zoom_interpolate([(5.0, 2.0.into()), (16.0, 8.0.into())]),
        )
        .with_paint("line-opacity", 0.9)
}
