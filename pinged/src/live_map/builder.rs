use std::time::Duration;

use log::{error, info};
use pinged_types::geo::GeoPoint;

use super::LiveMap;
use crate::beacon::{BeaconStore, PersistentStorage};
use crate::clipboard::{Clipboard, NoClipboard};
use crate::config::MapConfig;
use crate::control::{DummyScheduler, GestureConfig, GestureDisambiguator, HoldScheduler};
use crate::engine::{CameraUpdate, RenderEngine};
use crate::error::EngineError;
use crate::fix::GeoFixFilter;
use crate::form::AnnotationFormController;
use crate::layer::{LayerReconciler, ReconcilerConfig, VisualLayerState};
use crate::recenter::{RecenterConfig, RecenterPolicy};
use crate::route::RouteOverlay;
use crate::status::StatusChannel;
use crate::weather::WeatherCycle;

/// Convenience type to initialize a [`LiveMap`].
///
/// ```
/// use pinged::engine::HeadlessEngine;
/// use pinged::beacon::MemoryStorage;
/// use pinged::{LiveMapBuilder, MapConfig};
///
/// let config = MapConfig::default();
/// let engine = HeadlessEngine::with_basemaps(&config.styles);
///
/// let map = LiveMapBuilder::new(engine)
///     .with_config(config)
///     .with_storage(MemoryStorage::new())
///     .build()
///     .expect("map is initialized");
///
/// assert!(map.beacons().is_empty());
/// assert!(map.is_tracking());
/// ```
pub struct LiveMapBuilder<E: RenderEngine> {
    engine: E,
    config: MapConfig,
    storage: Option<Box<dyn PersistentStorage>>,
    scheduler: Option<Box<dyn HoldScheduler>>,
    clipboard: Option<Box<dyn Clipboard>>,
    recenter: RecenterConfig,
    gestures: GestureConfig,
    reconciler: ReconcilerConfig,
}

impl<E: RenderEngine> LiveMapBuilder<E> {
    /// Creates a builder driving the given engine, with the default configuration.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: MapConfig::default(),
            storage: None,
            scheduler: None,
            clipboard: None,
            recenter: RecenterConfig::default(),
            gestures: GestureConfig::default(),
            reconciler: ReconcilerConfig::default(),
        }
    }

    /// Sets the map configuration.
    pub fn with_config(mut self, config: MapConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the storage the beacons are persisted to.
    ///
    /// Without a storage beacons live only as long as the map.
    pub fn with_storage(mut self, storage: impl PersistentStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Sets the timer service used to confirm hold gestures.
    ///
    /// Without a scheduler the host must call [`LiveMap::tick`] periodically while a hold is
    /// pending.
    pub fn with_scheduler(mut self, scheduler: impl HoldScheduler + 'static) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    /// Sets the system clipboard.
    pub fn with_clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Some(Box::new(clipboard));
        self
    }

    /// Sets the rules of following the user with the viewport.
    pub fn with_recenter_config(mut self, config: RecenterConfig) -> Self {
        self.recenter = config;
        self
    }

    /// Sets the hold gesture thresholds.
    pub fn with_gesture_config(mut self, config: GestureConfig) -> Self {
        self.gestures = config;
        self
    }

    /// Sets the parameters of the visual overlays.
    pub fn with_reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.reconciler = config;
        self
    }

    /// Consumes the builder and creates the map.
    ///
    /// Moves the viewport to the default position, loads the first style of the catalogue and
    /// places markers of the stored beacons. Fails if the catalogue is empty or the engine cannot
    /// load the style.
    pub fn build(self) -> Result<LiveMap<E>, EngineError> {
        let Self {
            mut engine,
            config,
            storage,
            scheduler,
            clipboard,
            recenter,
            gestures,
            reconciler,
        } = self;

        let Some(first_style) = config.styles.first() else {
            error!("Cannot start the map: the style catalogue is empty");
            return Err(EngineError::Init("no basemap styles configured".into()));
        };

        if !config.default_center.is_valid() {
            error!("Invalid default center {:?}", config.default_center);
            return Err(EngineError::Init("invalid default center".into()));
        }

        engine.ease_to(
            CameraUpdate::center(config.default_center).with_zoom(config.default_zoom),
        );
        engine.load_style(&first_style.id).map_err(|err| {
            error!("Failed to load initial style {}: {err}", first_style.id);
            EngineError::Init(err.to_string())
        })?;

        let beacons = match storage {
            Some(storage) => BeaconStore::load(storage),
            None => BeaconStore::in_memory(),
        };
        info!("Live map started with {} beacons", beacons.list().len());

        let status = StatusChannel::new(Duration::from_millis(config.status_duration_ms));
        let weather = WeatherCycle::new(config.weather.clone());

        let mut map = LiveMap {
            config,
            engine,
            state: VisualLayerState::default(),
            fix_filter: GeoFixFilter::new(),
            recenter: RecenterPolicy::new(recenter),
            beacons,
            gestures: GestureDisambiguator::new(gestures),
            forms: AnnotationFormController::new(),
            reconciler: LayerReconciler::new(reconciler),
            routes: RouteOverlay::default(),
            weather,
            status,
            scheduler: scheduler.unwrap_or_else(|| Box::new(DummyScheduler)),
            clipboard: clipboard.unwrap_or_else(|| Box::new(NoClipboard)),
            tracking_enabled: true,
            user_position: None,
            destination: None,
            info_popup: None,
        };

        let stored: Vec<_> = map.beacons.list().to_vec();
        for beacon in &stored {
            map.place_beacon_marker(beacon);
        }

        Ok(map)
    }
}
