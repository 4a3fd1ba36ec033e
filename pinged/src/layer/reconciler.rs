use log::{debug, warn};

use crate::config::StyleEntry;
use crate::engine::{CameraUpdate, RenderEngine};
use crate::error::EngineError;
use crate::layer::{definitions, ids, VisualLayerState};
use crate::style::{LayerSpec, SourceSpec, Visibility, VISIBILITY};

const DEFAULT_TERRAIN_EXAGGERATION: f64 = 1.5;
const DEFAULT_PITCH_THRESHOLD: f64 = 45.0;
const DEFAULT_TARGET_PITCH: f64 = 60.0;
const DEFAULT_BUILDINGS_FALLBACK_HEIGHT: f64 = 20.0;
const DEFAULT_BUILDINGS_MIN_ZOOM: f64 = 14.0;

/// Configuration of the [`LayerReconciler`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReconcilerConfig {
    terrain_exaggeration: f64,
    pitch_threshold: f64,
    target_pitch: f64,
    buildings_fallback_height: f64,
    buildings_min_zoom: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            terrain_exaggeration: DEFAULT_TERRAIN_EXAGGERATION,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            target_pitch: DEFAULT_TARGET_PITCH,
            buildings_fallback_height: DEFAULT_BUILDINGS_FALLBACK_HEIGHT,
            buildings_min_zoom: DEFAULT_BUILDINGS_MIN_ZOOM,
        }
    }
}

impl ReconcilerConfig {
    /// Multiplier of the terrain elevation.
    pub fn terrain_exaggeration(&self) -> f64 {
        self.terrain_exaggeration
    }

    /// Sets the terrain exaggeration.
    pub fn with_terrain_exaggeration(mut self, exaggeration: f64) -> Self {
        self.terrain_exaggeration = exaggeration;
        self
    }

    /// When terrain is shown and the camera pitch is below this value, the camera is tilted to
    /// [`ReconcilerConfig::target_pitch`].
    pub fn pitch_threshold(&self) -> f64 {
        self.pitch_threshold
    }

    /// Camera pitch to show the terrain with.
    pub fn target_pitch(&self) -> f64 {
        self.target_pitch
    }

    /// Sets the pitch threshold and the target pitch.
    pub fn with_pitch(mut self, threshold: f64, target: f64) -> Self {
        self.pitch_threshold = threshold;
        self.target_pitch = target;
        self
    }

    /// Height of buildings that have no height data.
    pub fn buildings_fallback_height(&self) -> f64 {
        self.buildings_fallback_height
    }

    /// Sets the fallback height of buildings.
    pub fn with_buildings_fallback_height(mut self, height: f64) -> Self {
        self.buildings_fallback_height = height;
        self
    }

    /// Buildings are not shown below this zoom level.
    pub fn buildings_min_zoom(&self) -> f64 {
        self.buildings_min_zoom
    }

    /// Sets the minimum zoom of buildings.
    pub fn with_buildings_min_zoom(mut self, zoom: f64) -> Self {
        self.buildings_min_zoom = zoom;
        self
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconcileReport {
    /// Number of engine calls that changed its state, including camera moves.
    pub mutations: usize,
    /// Engine calls that failed. The pass continues after a failure, so other overlays are
    /// still applied.
    pub failures: Vec<EngineError>,
}

impl ReconcileReport {
    /// Returns true if the pass did not change anything.
    pub fn is_noop(&self) -> bool {
        self.mutations == 0 && self.failures.is_empty()
    }

    fn record(&mut self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => self.mutations += 1,
            Err(err) => {
                warn!("Failed to apply map overlay: {err}");
                self.failures.push(err);
            }
        }
    }
}

/// Brings the rendering engine in line with a [`VisualLayerState`].
///
/// The engine drops all custom sources and layers when it loads a new style, so nothing the
/// reconciler added is assumed to still be there. Every pass queries the engine before each
/// change, which makes passes idempotent: running a pass twice with the same desired state
/// changes nothing the second time.
#[derive(Debug, Clone, Default)]
pub struct LayerReconciler {
    config: ReconcilerConfig,
}

impl LayerReconciler {
    /// Creates a new reconciler.
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Configuration of the reconciler.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Index of the catalogue style the engine reports as loaded. Matching is done by a
    /// case-insensitive search of the style labels in the style name; the longest matching label
    /// wins, so that `Mapbox Satellite Streets` is recognized as `Satellite` and not `Streets`.
    pub fn style_index(style_name: &str, styles: &[StyleEntry]) -> Option<usize> {
        let name = style_name.to_lowercase();
        styles
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                !entry.label.is_empty() && name.contains(&entry.label.to_lowercase())
            })
            .max_by_key(|(index, entry)| (entry.label.len(), std::cmp::Reverse(*index)))
            .map(|(index, _)| index)
    }

    /// Runs a reconciliation pass.
    pub fn reconcile<E: RenderEngine + ?Sized>(
        &self,
        desired: &VisualLayerState,
        engine: &mut E,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        self.reconcile_terrain(desired.terrain_on, engine, &mut report);
        self.reconcile_buildings(desired.buildings_3d_on, engine, &mut report);
        self.reconcile_traffic(desired.traffic_on, engine, &mut report);
        self.reconcile_weather(desired, engine, &mut report);
        self.reconcile_route(desired, engine, &mut report);

        debug!(
            "Reconciliation pass finished with {} mutations and {} failures",
            report.mutations,
            report.failures.len()
        );
        report
    }

    fn reconcile_terrain<E: RenderEngine + ?Sized>(
        &self,
        on: bool,
        engine: &mut E,
        report: &mut ReconcileReport,
    ) {
        if on {
            if !engine.has_source(ids::TERRAIN_SOURCE) {
                report.record(engine.add_source(ids::TERRAIN_SOURCE, definitions::terrain_source()));
            }

            let terrain = definitions::terrain(&self.config);
            if engine.terrain() != Some(&terrain) {
                report.record(engine.set_terrain(Some(terrain)));
            }

            if engine.camera().pitch < self.config.pitch_threshold {
                engine.ease_to(CameraUpdate::pitch(self.config.target_pitch));
                report.mutations += 1;
            }

            if !engine.has_layer(ids::SKY_LAYER) {
                report.record(engine.add_layer(definitions::sky_layer(), None));
            }
        } else {
            if engine.terrain().is_some() {
                report.record(engine.set_terrain(None));
            }

            if engine.has_layer(ids::SKY_LAYER) {
                report.record(engine.remove_layer(ids::SKY_LAYER));
            }
        }
    }

    fn reconcile_buildings<E: RenderEngine + ?Sized>(
        &self,
        on: bool,
        engine: &mut E,
        report: &mut ReconcileReport,
    ) {
        if !on {
            if engine.has_layer(ids::BUILDINGS_LAYER) {
                report.record(engine.remove_layer(ids::BUILDINGS_LAYER));
            }
            return;
        }

        if engine.has_layer(ids::BUILDINGS_LAYER) {
            return;
        }

        if !engine.has_source(ids::BUILDINGS_SOURCE) {
            debug!("Style has no building data, 3D buildings are not shown");
            return;
        }

        let first_label = engine
            .layers()
            .into_iter()
            .find(|layer| layer.is_label())
            .map(|layer| layer.id.clone());
        report.record(engine.add_layer(
            definitions::buildings_layer(&self.config),
            first_label.as_deref(),
        ));
    }

    fn reconcile_traffic<E: RenderEngine + ?Sized>(
        &self,
        on: bool,
        engine: &mut E,
        report: &mut ReconcileReport,
    ) {
        if !on {
            hide_layer(engine, ids::TRAFFIC_LAYER, report);
            return;
        }

        if !engine.has_source(ids::TRAFFIC_SOURCE) {
            report.record(engine.add_source(ids::TRAFFIC_SOURCE, definitions::traffic_source()));
        }

        if !engine.has_layer(ids::TRAFFIC_LAYER) {
            report.record(engine.add_layer(definitions::traffic_layer(), None));
            return;
        }

        show_layer(engine, ids::TRAFFIC_LAYER, report);
        keep_above_basemap(engine, ids::TRAFFIC_LAYER, report);
    }

    fn reconcile_weather<E: RenderEngine + ?Sized>(
        &self,
        desired: &VisualLayerState,
        engine: &mut E,
        report: &mut ReconcileReport,
    ) {
        let Some(selection) = &desired.weather else {
            hide_layer(engine, ids::WEATHER_LAYER, report);
            return;
        };

        ensure_source(
            engine,
            ids::WEATHER_SOURCE,
            definitions::weather_source(selection),
            report,
        );

        let layer = definitions::weather_layer(selection);
        let Some(existing) = engine.layer(ids::WEATHER_LAYER) else {
            report.record(engine.add_layer(layer, None));
            return;
        };

        let changed_paint: Vec<_> = layer
            .paint
            .into_iter()
            .filter(|(name, value)| existing.paint.get(name) != Some(value))
            .collect();
        for (name, value) in changed_paint {
            report.record(engine.set_paint_property(ids::WEATHER_LAYER, &name, value));
        }

        show_layer(engine, ids::WEATHER_LAYER, report);
        keep_above_basemap(engine, ids::WEATHER_LAYER, report);
    }

    fn reconcile_route<E: RenderEngine + ?Sized>(
        &self,
        desired: &VisualLayerState,
        engine: &mut E,
        report: &mut ReconcileReport,
    ) {
        let Some(route) = &desired.active_route else {
            if engine.has_layer(ids::ROUTE_LAYER) {
                report.record(engine.remove_layer(ids::ROUTE_LAYER));
            }
            if engine.has_source(ids::ROUTE_SOURCE) {
                report.record(engine.remove_source(ids::ROUTE_SOURCE));
            }
            return;
        };

        ensure_source(
            engine,
            ids::ROUTE_SOURCE,
            definitions::route_source(route),
            report,
        );

        if !engine.has_layer(ids::ROUTE_LAYER) {
            report.record(engine.add_layer(definitions::route_layer(), None));
        }
    }
}

/// Adds the source, or replaces its data if it differs.
fn ensure_source<E: RenderEngine + ?Sized>(
    engine: &mut E,
    id: &str,
    source: SourceSpec,
    report: &mut ReconcileReport,
) {
    match engine.source(id) {
        None => report.record(engine.add_source(id, source)),
        Some(existing) if *existing == source => {}
        Some(_) => report.record(engine.update_source(id, source)),
    }
}

fn is_visible(layer: Option<&LayerSpec>) -> Option<bool> {
    layer.map(|l| l.visibility() == Visibility::Visible)
}

fn hide_layer<E: RenderEngine + ?Sized>(engine: &mut E, id: &str, report: &mut ReconcileReport) {
    if is_visible(engine.layer(id)) == Some(true) {
        report.record(engine.set_layout_property(id, VISIBILITY, Visibility::None.into()));
    }
}

fn show_layer<E: RenderEngine + ?Sized>(engine: &mut E, id: &str, report: &mut ReconcileReport) {
    if is_visible(engine.layer(id)) == Some(false) {
        report.record(engine.set_layout_property(id, VISIBILITY, Visibility::Visible.into()));
    }
}

/// Moves the layer to the top if any basemap layer is drawn over it. Other overlays are allowed
/// above it, so two overlays that both keep to the top don't swap places on every pass.
fn keep_above_basemap<E: RenderEngine + ?Sized>(
    engine: &mut E,
    id: &str,
    report: &mut ReconcileReport,
) {
    let covered = engine
        .layers()
        .into_iter()
        .skip_while(|layer| layer.id != id)
        .skip(1)
        .any(|layer| !ids::OVERLAY_LAYERS.contains(&layer.id.as_str()));

    if covered {
        report.record(engine.move_layer(id, None));
    }
}
