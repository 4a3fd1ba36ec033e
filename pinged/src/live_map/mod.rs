//! The live map: every component of the engine wired to the injected collaborators.

use log::{debug, info, warn};
use pinged_types::geo::{GeoPoint, GeoPoint2d};
use web_time::SystemTime;

use crate::beacon::{Beacon, BeaconId, BeaconStore};
use crate::clipboard::{format_coordinates, Clipboard};
use crate::config::MapConfig;
use crate::control::{
    GestureDisambiguator, GestureOutcome, GestureState, HoldScheduler, HoldToken, PointerEvent,
    PointerEventKind, PointerTarget,
};
use crate::engine::{
    CameraUpdate, MarkerAnchor, MarkerKey, MarkerSpec, PopupContent, PopupId, PopupSpec,
    RenderEngine,
};
use crate::error::{ClipboardError, EngineError, GeolocationError, RoutingError};
use crate::fix::{FixDecision, GeoFixFilter, LocationFix};
use crate::form::{AnnotationForm, AnnotationFormController, FormEvent, FormKey};
use crate::geolocation::LocationUpdate;
use crate::layer::{LayerReconciler, ReconcileReport, VisualLayerState};
use crate::recenter::RecenterPolicy;
use crate::route::{
    RouteGeometry, RouteOverlay, RouteRequest, RouteResolution, RouteTicket, RoutingService,
};
use crate::status::StatusChannel;
use crate::weather::{weather_label, WeatherCycle};

mod builder;

pub use builder::LiveMapBuilder;

const PUCK_CLASS: &str = "me-puck";
const BEACON_CLASS: &str = "beacon-marker";
const DESTINATION_CLASS: &str = "dest-marker";
const USER_TITLE: &str = "You";
const DEFAULT_DESTINATION_LABEL: &str = "Destination";
const LABEL_PLACEHOLDER: &str = "Beacon label (optional)";

/// What the live map did with a location update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// The first valid fix: the viewport was centered on it.
    FirstFix,
    /// The viewport followed the user.
    Recentered,
    /// The puck moved, the viewport stayed.
    Updated,
    /// The fix has invalid coordinates.
    Rejected,
    /// Live tracking is disabled after a sensor failure.
    Ignored,
}

/// Route request started by [`LiveMap::begin_route`]. The host runs the request with
/// [`RouteOverlay::fetch`] and hands the result to [`LiveMap::resolve_route`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PendingRoute {
    /// Ticket of the request.
    pub ticket: RouteTicket,
    /// Request to send to the routing service.
    pub request: RouteRequest,
}

#[derive(Debug, Clone)]
struct Destination {
    position: GeoPoint2d,
    label: String,
}

/// Live map annotation engine.
///
/// All methods are called from a single event loop. Methods that react to events take the time
/// of the event, which drives the status line and the gesture timing.
pub struct LiveMap<E: RenderEngine> {
    config: MapConfig,
    engine: E,
    state: VisualLayerState,
    fix_filter: GeoFixFilter,
    recenter: RecenterPolicy,
    beacons: BeaconStore,
    gestures: GestureDisambiguator,
    forms: AnnotationFormController,
    reconciler: LayerReconciler,
    routes: RouteOverlay,
    weather: WeatherCycle,
    status: StatusChannel,
    scheduler: Box<dyn HoldScheduler>,
    clipboard: Box<dyn Clipboard>,
    tracking_enabled: bool,
    user_position: Option<GeoPoint2d>,
    destination: Option<Destination>,
    info_popup: Option<PopupId>,
}

impl<E: RenderEngine> LiveMap<E> {
    /// Configuration of the map.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The rendering engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the rendering engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Desired visual state.
    pub fn state(&self) -> &VisualLayerState {
        &self.state
    }

    /// Stored beacons.
    pub fn beacons(&self) -> &[Beacon] {
        self.beacons.list()
    }

    /// Returns true if beacon changes are still persisted.
    pub fn is_persistent(&self) -> bool {
        self.beacons.is_persistent()
    }

    /// Status line visible at the given time.
    pub fn status(&self, now: SystemTime) -> Option<&str> {
        self.status.visible(now)
    }

    /// State of the latest gesture session.
    pub fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    /// The open label form.
    pub fn form(&self) -> Option<&AnnotationForm> {
        self.forms.current()
    }

    /// Last known position of the user.
    pub fn user_position(&self) -> Option<GeoPoint2d> {
        self.user_position
    }

    /// Returns true until the location sensor fails.
    pub fn is_tracking(&self) -> bool {
        self.tracking_enabled
    }

    /// Key of the selected weather overlay.
    pub fn weather_key(&self) -> Option<&str> {
        self.weather.current_key()
    }

    /// Handles an update delivered by the location sensor.
    pub fn handle_location(&mut self, update: LocationUpdate, now: SystemTime) -> FixOutcome {
        match update {
            Ok(fix) => self.handle_fix(&fix, now),
            Err(err) => {
                self.sensor_failed(err, now);
                FixOutcome::Ignored
            }
        }
    }

    /// Handles a location fix: moves the puck and, if needed, the viewport.
    ///
    /// The first valid fix always centers the viewport and zooms in. Later fixes move the viewport
    /// only when the [`RecenterPolicy`] allows it.
    pub fn handle_fix(&mut self, fix: &LocationFix, now: SystemTime) -> FixOutcome {
        if !self.tracking_enabled {
            return FixOutcome::Ignored;
        }

        let decision = self.fix_filter.ingest(fix);
        if decision == FixDecision::Rejected {
            return FixOutcome::Rejected;
        }

        self.update_puck(fix.position);

        if decision == FixDecision::First {
            let zoom = self
                .engine
                .camera()
                .zoom
                .max(self.config.first_fix_min_zoom);
            self.engine
                .ease_to(CameraUpdate::center(fix.position).with_zoom(zoom));
            self.recenter.on_recentered(now);
            self.status.post("Location acquired", now);
            return FixOutcome::FirstFix;
        }

        let center = self.engine.camera().center;
        if self.recenter.should_recenter(&center, fix, now) {
            self.engine.ease_to(CameraUpdate::center(fix.position));
            self.recenter.on_recentered(now);
            FixOutcome::Recentered
        } else {
            FixOutcome::Updated
        }
    }

    /// Reports a location sensor failure.
    ///
    /// A missing sensor or a refused permission disables live tracking for the rest of the
    /// session and is shown once. A position that is temporarily unavailable is only reported:
    /// the watch keeps running and the next fix is handled as usual.
    pub fn sensor_failed(&mut self, error: GeolocationError, now: SystemTime) {
        if !self.tracking_enabled {
            return;
        }

        let message = match &error {
            GeolocationError::Unsupported => {
                "Geolocation not supported on this device/browser.".to_string()
            }
            GeolocationError::PermissionDenied => "Location permission denied.".to_string(),
            GeolocationError::Unavailable(_) => {
                warn!("Location sensor error: {error}");
                self.status.post("Location unavailable", now);
                return;
            }
        };

        warn!("Location tracking disabled: {error}");
        self.tracking_enabled = false;
        self.status.post(message, now);
    }

    /// Handles a pointer event on the map surface. Missing location and target of the event are
    /// filled in from the engine. Returns the gestures recognized by the event.
    pub fn handle_pointer(
        &mut self,
        mut event: PointerEvent,
        now: SystemTime,
    ) -> Vec<GestureOutcome> {
        if event.location.is_none() {
            event.location = self.engine.unproject(&event.position);
        }
        if event.target.is_none() && matches!(event.kind, PointerEventKind::Down(_)) {
            event.target = Some(
                self.engine
                    .marker_at(&event.position)
                    .map(PointerTarget::Marker)
                    .unwrap_or(PointerTarget::Map),
            );
        }

        let outcomes = self.gestures.handle(&event, now);
        for outcome in &outcomes {
            self.apply_gesture(outcome, now);
        }

        outcomes
    }

    /// Hold timer with the given token fired. Returns true if it confirmed a hold gesture.
    pub fn hold_elapsed(&mut self, token: HoldToken, now: SystemTime) -> bool {
        match self.gestures.hold_elapsed(token) {
            Some(outcome) => {
                self.apply_gesture(&outcome, now);
                true
            }
            None => false,
        }
    }

    /// Confirms a pending hold gesture if its time has come. For hosts that drive gestures from a
    /// frame loop instead of timers.
    pub fn tick(&mut self, now: SystemTime) -> bool {
        match self.gestures.tick(now) {
            Some(outcome) => {
                self.apply_gesture(&outcome, now);
                true
            }
            None => false,
        }
    }

    /// Must be called every time the engine finishes loading a style. Re-applies all overlays.
    pub fn style_loaded(&mut self) -> ReconcileReport {
        if let Some(name) = self.engine.style_name() {
            match LayerReconciler::style_index(name, &self.config.styles) {
                Some(index) => self.state.style_index = index,
                None => debug!("Loaded style {name} is not in the style catalogue"),
            }
        }

        self.reconcile()
    }

    /// Replaces the text of the label form.
    pub fn form_input(&mut self, text: &str, now: SystemTime) {
        let event = self.forms.input(text, &mut self.beacons);
        match event {
            Some(event) => self.apply_form_event(event, now),
            None => self.refresh_form_popup(),
        }
    }

    /// Handles a key press in the label form.
    pub fn form_key(&mut self, key: FormKey, now: SystemTime) {
        if let Some(event) = self.forms.key(key, &mut self.beacons) {
            self.apply_form_event(event, now);
        }
    }

    /// Creates a beacon from the label form.
    pub fn submit_form(&mut self, now: SystemTime) -> Option<Beacon> {
        let event = self.forms.submit(&mut self.beacons)?;
        let beacon = match &event {
            FormEvent::Submitted { beacon, .. } => beacon.clone(),
            FormEvent::Cancelled { .. } => None,
        };
        self.apply_form_event(event, now);
        beacon
    }

    /// Closes the label form without creating a beacon.
    pub fn cancel_form(&mut self, now: SystemTime) {
        if let Some(event) = self.forms.cancel() {
            self.apply_form_event(event, now);
        }
    }

    /// Creates a beacon at the point.
    pub fn add_beacon(
        &mut self,
        position: GeoPoint2d,
        label: &str,
        now: SystemTime,
    ) -> Option<Beacon> {
        let beacon = self.beacons.create(position.lat(), position.lon(), label)?;
        self.place_beacon_marker(&beacon);
        self.status.post("Beacon added", now);
        Some(beacon)
    }

    /// Deletes a beacon and its marker. Does nothing if there is no such beacon.
    pub fn delete_beacon(&mut self, id: &BeaconId, now: SystemTime) -> Option<Beacon> {
        let removed = self.beacons.delete(id)?;
        self.engine.remove_marker(&MarkerKey::Beacon(id.clone()));
        self.status.post("Beacon removed", now);
        Some(removed)
    }

    /// Deletes all beacons and their markers. Returns the number of deleted beacons.
    pub fn clear_beacons(&mut self, now: SystemTime) -> usize {
        let removed = self.beacons.clear();
        for id in &removed {
            self.engine.remove_marker(&MarkerKey::Beacon(id.clone()));
        }

        self.status.post("Beacons cleared", now);
        removed.len()
    }

    /// Starts a route request from the user position (or the viewport center, if the position is
    /// not known yet) to the destination.
    pub fn begin_route(
        &mut self,
        destination: GeoPoint2d,
        now: SystemTime,
    ) -> Result<PendingRoute, RoutingError> {
        let origin = self
            .user_position
            .unwrap_or_else(|| self.engine.camera().center);
        match self
            .routes
            .begin(origin, destination, self.config.routing.profile)
        {
            Ok((ticket, request)) => Ok(PendingRoute { ticket, request }),
            Err(err) => {
                self.status.post(route_failure_message(&err), now);
                Err(err)
            }
        }
    }

    /// Applies the result of a route request, whatever happened to the map while the request
    /// was in flight.
    pub fn resolve_route(
        &mut self,
        ticket: RouteTicket,
        result: Result<RouteGeometry, RoutingError>,
        now: SystemTime,
    ) -> RouteResolution {
        let resolution = self.routes.resolve(
            ticket,
            result,
            &mut self.state,
            &self.reconciler,
            &mut self.engine,
        );

        match &resolution {
            RouteResolution::Applied { summary, .. } => {
                self.status.post(format!("Route: {summary}"), now);
            }
            RouteResolution::Failed(err) => {
                self.status.post(route_failure_message(err), now);
            }
            RouteResolution::Superseded => {}
        }

        resolution
    }

    /// Requests a route and applies the result. The map is borrowed for the whole request; hosts
    /// that need the map while the request is in flight use [`LiveMap::begin_route`] and
    /// [`LiveMap::resolve_route`] instead.
    pub async fn route_to(
        &mut self,
        service: &(impl RoutingService + ?Sized),
        destination: GeoPoint2d,
        now: SystemTime,
    ) -> RouteResolution {
        let pending = match self.begin_route(destination, now) {
            Ok(pending) => pending,
            Err(err) => return RouteResolution::Failed(err),
        };

        let result = RouteOverlay::fetch(service, &pending.request).await;
        self.resolve_route(pending.ticket, result, now)
    }

    /// Removes the route.
    pub fn clear_route(&mut self) -> ReconcileReport {
        self.routes
            .clear(&mut self.state, &self.reconciler, &mut self.engine)
    }

    /// Switches the terrain on or off. Returns the new state.
    pub fn toggle_terrain(&mut self, now: SystemTime) -> bool {
        self.state.terrain_on = !self.state.terrain_on;
        self.reconcile();
        self.status
            .post(format!("Terrain: {}", on_off(self.state.terrain_on)), now);
        self.state.terrain_on
    }

    /// Switches the 3D buildings on or off. Returns the new state.
    pub fn toggle_buildings(&mut self, now: SystemTime) -> bool {
        self.state.buildings_3d_on = !self.state.buildings_3d_on;
        self.reconcile();
        self.status.post(
            format!("3D buildings: {}", on_off(self.state.buildings_3d_on)),
            now,
        );
        self.state.buildings_3d_on
    }

    /// Switches the traffic lines on or off. Returns the new state.
    pub fn toggle_traffic(&mut self, now: SystemTime) -> bool {
        self.state.traffic_on = !self.state.traffic_on;
        self.reconcile();
        self.status
            .post(format!("Traffic: {}", on_off(self.state.traffic_on)), now);
        self.state.traffic_on
    }

    /// Switches the weather overlay on or off. Returns true if the overlay is shown after the
    /// call.
    pub fn toggle_weather(&mut self, now: SystemTime) -> bool {
        if self.state.weather.take().is_some() {
            self.reconcile();
            self.status.post("Weather: Off", now);
            return false;
        }

        self.show_weather(now)
    }

    /// Selects the next weather overlay and shows it.
    pub fn cycle_weather(&mut self, now: SystemTime) -> bool {
        if let Err(unavailable) = self.weather.advance() {
            self.status.post(unavailable.message(), now);
            return false;
        }

        self.show_weather(now)
    }

    /// Loads the basemap style with the given catalogue index. Out of range indices are ignored.
    ///
    /// Overlays are re-applied when the engine reports the style as loaded with
    /// [`LiveMap::style_loaded`].
    pub fn select_style(&mut self, index: usize, now: SystemTime) -> Result<bool, EngineError> {
        let Some(entry) = self.config.styles.get(index) else {
            debug!("Ignoring selection of unknown style {index}");
            return Ok(false);
        };

        self.engine.load_style(&entry.id)?;
        self.state.style_index = index;
        self.status.post(format!("Style: {}", entry.label), now);
        Ok(true)
    }

    /// Places the destination marker, shows its popup and moves the viewport to it.
    pub fn set_destination(&mut self, position: GeoPoint2d, label: Option<&str>) {
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_DESTINATION_LABEL)
            .to_string();

        // Replaces the previous destination marker together with its title.
        self.engine.add_marker(
            MarkerKey::Destination,
            MarkerSpec::new(position, DESTINATION_CLASS)
                .with_title(label.clone())
                .with_anchor(MarkerAnchor::Bottom),
        );

        self.destination = Some(Destination { position, label });
        self.show_destination_popup();

        let zoom = self
            .engine
            .camera()
            .zoom
            .max(self.config.first_fix_min_zoom);
        self.engine
            .ease_to(CameraUpdate::center(position).with_zoom(zoom));
    }

    /// Copies the coordinates of the point to the clipboard.
    pub fn copy_coordinates(
        &mut self,
        position: GeoPoint2d,
        now: SystemTime,
    ) -> Result<(), ClipboardError> {
        match self.clipboard.write_text(&format_coordinates(&position)) {
            Ok(()) => {
                self.status.post("Coordinates copied", now);
                Ok(())
            }
            Err(err) => {
                warn!("Failed to copy coordinates: {err}");
                self.status.post("Could not copy coordinates", now);
                Err(err)
            }
        }
    }

    fn reconcile(&mut self) -> ReconcileReport {
        self.reconciler.reconcile(&self.state, &mut self.engine)
    }

    fn show_weather(&mut self, now: SystemTime) -> bool {
        match self.weather.selection(now) {
            Ok(selection) => {
                let label = weather_label(&selection.key);
                self.state.weather = Some(selection);
                self.reconcile();
                self.status.post(format!("Weather: {label}"), now);
                true
            }
            Err(unavailable) => {
                self.status.post(unavailable.message(), now);
                false
            }
        }
    }

    fn apply_gesture(&mut self, outcome: &GestureOutcome, now: SystemTime) {
        match outcome {
            GestureOutcome::Armed { token, delay } => self.scheduler.schedule(*token, *delay),
            GestureOutcome::Cancelled { token, .. } => self.scheduler.cancel(*token),
            GestureOutcome::Confirmed { location } => self.open_form(*location),
            GestureOutcome::Tap { key } => self.show_marker_popup(key),
            GestureOutcome::DropBeacon { location } => {
                self.add_beacon(*location, "", now);
            }
            GestureOutcome::RemoveMarker { key } => match key {
                MarkerKey::Beacon(id) => {
                    self.delete_beacon(id, now);
                }
                other => debug!("Marker {other:?} cannot be removed by the user"),
            },
        }
    }

    fn open_form(&mut self, location: GeoPoint2d) {
        if let Some(previous) = self.forms.open(location) {
            if let Some(popup) = previous.popup() {
                self.engine.close_popup(popup);
            }
        }

        let popup = self.engine.open_popup(PopupSpec {
            position: location,
            content: label_input(""),
        });
        self.forms.set_popup(popup);
    }

    fn refresh_form_popup(&mut self) {
        let Some(form) = self.forms.current() else {
            return;
        };
        let Some(popup) = form.popup() else {
            return;
        };

        let content = label_input(form.text());
        if let Err(err) = self.engine.update_popup(popup, content) {
            debug!("Label form popup is gone: {err}");
        }
    }

    fn apply_form_event(&mut self, event: FormEvent, now: SystemTime) {
        let form = match &event {
            FormEvent::Submitted { form, .. } | FormEvent::Cancelled { form } => form,
        };
        if let Some(popup) = form.popup() {
            self.engine.close_popup(popup);
        }

        if let FormEvent::Submitted {
            beacon: Some(beacon),
            ..
        } = &event
        {
            self.place_beacon_marker(beacon);
            self.status.post("Beacon added", now);
        }
    }

    fn place_beacon_marker(&mut self, beacon: &Beacon) {
        self.engine.add_marker(
            MarkerKey::Beacon(beacon.id.clone()),
            MarkerSpec::new(beacon.position(), BEACON_CLASS)
                .with_title(beacon.display_label())
                .with_anchor(MarkerAnchor::Bottom),
        );
    }

    fn update_puck(&mut self, position: GeoPoint2d) {
        self.user_position = Some(position);
        if self.engine.has_marker(&MarkerKey::Puck) {
            if let Err(err) = self.engine.set_marker_position(&MarkerKey::Puck, position) {
                warn!("Failed to move location puck: {err}");
            }
        } else {
            self.engine.add_marker(
                MarkerKey::Puck,
                MarkerSpec::new(position, PUCK_CLASS).with_title(USER_TITLE),
            );
        }
    }

    fn show_marker_popup(&mut self, key: &MarkerKey) {
        match key {
            MarkerKey::Puck => {
                if let Some(position) = self.user_position {
                    self.show_info_popup(position, USER_TITLE.to_string(), None);
                }
            }
            MarkerKey::Destination => self.show_destination_popup(),
            MarkerKey::Beacon(id) => {
                if let Some(beacon) = self.beacons.get(id) {
                    let position = beacon.position();
                    let title = beacon.display_label().to_string();
                    self.show_info_popup(position, title, None);
                }
            }
        }
    }

    fn show_destination_popup(&mut self) {
        let Some(destination) = &self.destination else {
            return;
        };

        let position = destination.position;
        let title = destination.label.clone();
        let link = navigation_url(&position);
        self.show_info_popup(position, title, Some(link));
    }

    fn show_info_popup(&mut self, position: GeoPoint2d, title: String, link: Option<String>) {
        if let Some(previous) = self.info_popup.take() {
            self.engine.close_popup(previous);
        }

        let popup = self.engine.open_popup(PopupSpec {
            position,
            content: PopupContent::Info {
                title,
                lines: vec![format_coordinates(&position)],
                link,
            },
        });
        self.info_popup = Some(popup);
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

fn label_input(value: &str) -> PopupContent {
    PopupContent::LabelInput {
        placeholder: LABEL_PLACEHOLDER.to_string(),
        value: value.to_string(),
    }
}

fn route_failure_message(err: &RoutingError) -> String {
    match err {
        RoutingError::NoRoute => "No route found".to_string(),
        err => {
            info!("Route request failed: {err}");
            format!("Could not get route: {err}")
        }
    }
}

/// Link that opens turn-by-turn navigation to the point in an external map application.
pub fn navigation_url(destination: &GeoPoint2d) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        destination.lat(),
        destination.lon()
    )
}
