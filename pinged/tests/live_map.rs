use std::time::Duration;

use approx::assert_abs_diff_eq;
use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use pinged::beacon::{MemoryStorage, PersistentStorage, BEACON_STORAGE_KEY};
use pinged::clipboard::MemoryClipboard;
use pinged::config::WeatherConfig;
use pinged::control::{
    GestureOutcome, GestureState, ManualScheduler, MouseButton, PointerEvent, PointerTarget,
};
use pinged::engine::{HeadlessEngine, MarkerKey, PopupContent};
use pinged::error::{GeolocationError, RoutingError};
use pinged::fix::LocationFix;
use pinged::form::FormKey;
use pinged::layer::ids;
use pinged::pinged_types::geo::GeoPoint;
use pinged::pinged_types::latlon;
use pinged::pinged_types::screen::ScreenPoint;
use pinged::route::{RouteGeometry, RouteRequest, RouteResolution, RoutingService};
use pinged::{FixOutcome, LiveMap, LiveMapBuilder, MapConfig, RenderEngine};
use web_time::SystemTime;

fn at(ms: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_millis(ms)
}

fn live_map(storage: MemoryStorage) -> LiveMap<HeadlessEngine> {
    let config = MapConfig::default();
    LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .with_storage(storage)
        .build()
        .expect("map is created")
}

fn screen(x: f64, y: f64) -> ScreenPoint {
    ScreenPoint::new(x, y)
}

struct FakeRouting {
    calls: Mutex<Vec<RouteRequest>>,
}

#[async_trait]
impl RoutingService for FakeRouting {
    async fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
        self.calls.lock().push(*request);
        Ok(RouteGeometry {
            coordinates: vec![
                request.origin.lonlat_array(),
                [174.77, -36.85],
                request.destination.lonlat_array(),
            ],
            distance_m: 2430.0,
            duration_s: 420.0,
        })
    }
}

#[test]
fn fix_stream_recenters_twice() {
    let mut map = live_map(MemoryStorage::new());
    let start = map.engine().camera().center;

    let first = LocationFix::new(-41.2865, 174.7762, at(0)).with_accuracy(10.0);
    assert_eq!(map.handle_fix(&first, at(0)), FixOutcome::FirstFix);
    assert!(map.engine().camera().zoom >= 14.0);
    assert_ne!(map.engine().camera().center, start);

    let nearby = LocationFix::new(-41.2866, 174.7762, at(5_000));
    assert_eq!(map.handle_fix(&nearby, at(5_000)), FixOutcome::Updated);

    let far = LocationFix::new(-41.2865 + 0.0046, 174.7762, at(25_000));
    assert_eq!(map.handle_fix(&far, at(25_000)), FixOutcome::Recentered);
    assert_abs_diff_eq!(map.engine().camera().center.lat(), -41.2819, epsilon = 1e-9);

    let puck = map.engine().marker(&MarkerKey::Puck).expect("puck is shown");
    assert_eq!(puck.position, far.position);
    assert_eq!(map.user_position(), Some(far.position));
}

#[test]
fn invalid_fix_is_ignored() {
    let mut map = live_map(MemoryStorage::new());
    let fix = LocationFix::new(f64::NAN, 10.0, at(0));

    assert_eq!(map.handle_fix(&fix, at(0)), FixOutcome::Rejected);
    assert!(!map.engine().has_marker(&MarkerKey::Puck));
    assert_eq!(map.status(at(0)), None);
}

#[test]
fn unsupported_sensor_disables_tracking() {
    let mut map = live_map(MemoryStorage::new());

    map.handle_location(Err(GeolocationError::Unsupported), at(0));
    assert!(!map.is_tracking());
    assert_eq!(
        map.status(at(0)),
        Some("Geolocation not supported on this device/browser.")
    );

    let fix = LocationFix::new(1.0, 2.0, at(100));
    assert_eq!(map.handle_location(Ok(fix), at(100)), FixOutcome::Ignored);
    assert!(!map.engine().has_marker(&MarkerKey::Puck));
}

#[test]
fn transient_sensor_error_keeps_tracking() {
    let mut map = live_map(MemoryStorage::new());

    let first = LocationFix::new(-36.85, 174.76, at(0));
    assert_eq!(map.handle_location(Ok(first), at(0)), FixOutcome::FirstFix);

    let timeout = GeolocationError::Unavailable("timeout".to_string());
    assert_eq!(map.handle_location(Err(timeout), at(1_000)), FixOutcome::Ignored);
    assert!(map.is_tracking());
    assert_eq!(map.status(at(1_000)), Some("Location unavailable"));

    let next = LocationFix::new(-36.8501, 174.76, at(2_000));
    assert_eq!(map.handle_location(Ok(next), at(2_000)), FixOutcome::Updated);
    assert_eq!(
        map.engine().marker(&MarkerKey::Puck).map(|m| m.position),
        Some(next.position)
    );
}

#[test]
fn denied_permission_disables_tracking() {
    let mut map = live_map(MemoryStorage::new());

    map.handle_location(Err(GeolocationError::PermissionDenied), at(0));
    assert!(!map.is_tracking());
    assert_eq!(map.status(at(0)), Some("Location permission denied."));

    let fix = LocationFix::new(1.0, 2.0, at(100));
    assert_eq!(map.handle_location(Ok(fix), at(100)), FixOutcome::Ignored);
}

#[test]
fn secondary_action_on_map_drops_unlabeled_beacon() {
    let storage = MemoryStorage::new();
    let mut map = live_map(storage.clone());
    let location = latlon!(-36.86, 174.77);

    let outcomes = map.handle_pointer(
        PointerEvent::down(MouseButton::Right, screen(300.0, 250.0)).at(location),
        at(0),
    );
    assert_eq!(outcomes, vec![GestureOutcome::DropBeacon { location }]);

    assert_eq!(map.beacons().len(), 1);
    let beacon = map.beacons()[0].clone();
    assert!(beacon.label.is_empty());
    assert_eq!(beacon.position(), location);

    let marker = map
        .engine()
        .marker(&MarkerKey::Beacon(beacon.id.clone()))
        .expect("marker is placed");
    assert_eq!(marker.title.as_deref(), Some("Beacon"));
    assert_eq!(map.status(at(0)), Some("Beacon added"));

    let stored = storage
        .get(BEACON_STORAGE_KEY)
        .expect("storage is readable")
        .expect("beacons are persisted");
    assert!(stored.contains(beacon.id.as_str()));
}

#[test]
fn clearing_beacons_removes_their_markers_only() {
    let storage = MemoryStorage::new();
    let mut map = live_map(storage.clone());
    map.handle_fix(&LocationFix::new(-36.85, 174.76, at(0)), at(0));
    map.set_destination(latlon!(-36.9, 174.8), None);

    for (lat, lon) in [(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)] {
        map.add_beacon(latlon!(lat, lon), "", at(100)).expect("valid position");
    }
    assert_eq!(map.engine().marker_count(), 5);

    assert_eq!(map.clear_beacons(at(200)), 3);

    assert!(map.beacons().is_empty());
    assert_eq!(map.engine().marker_count(), 2);
    assert!(map.engine().has_marker(&MarkerKey::Puck));
    assert!(map.engine().has_marker(&MarkerKey::Destination));
    assert_eq!(map.status(at(200)), Some("Beacons cleared"));
    assert_eq!(
        storage.get(BEACON_STORAGE_KEY).expect("storage is readable"),
        Some("[]".to_string())
    );
}

#[test]
fn long_press_creates_labeled_beacon_and_secondary_action_removes_it() {
    let storage = MemoryStorage::new();
    let scheduler = ManualScheduler::new();
    let config = MapConfig::default();
    let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .with_storage(storage.clone())
        .with_scheduler(scheduler.clone())
        .build()
        .expect("map is created");

    let location = latlon!(1.0, 2.0);
    let outcomes = map.handle_pointer(
        PointerEvent::down(MouseButton::Left, screen(200.0, 200.0))
            .at(location)
            .on(PointerTarget::Map),
        at(0),
    );
    assert_matches!(outcomes[..], [GestureOutcome::Armed { .. }]);

    for (x, y, t) in [(204.0, 197.0, 150), (206.0, 194.0, 300), (201.0, 205.0, 450)] {
        let outcomes = map.handle_pointer(PointerEvent::moved(screen(x, y)).at(location), at(t));
        assert!(outcomes.is_empty());
    }

    let pending = scheduler.take_pending();
    assert_eq!(pending.len(), 1);
    let (token, delay) = pending[0];
    assert_eq!(delay, Duration::from_millis(550));

    assert!(map.hold_elapsed(token, at(550)));
    assert_eq!(map.gesture_state(), GestureState::Confirmed);
    assert_eq!(map.form().map(|f| f.location()), Some(location));

    map.handle_pointer(PointerEvent::up(MouseButton::Left, screen(201.0, 205.0)), at(600));
    assert!(map.form().is_some());

    map.form_input("Lunch spot", at(700));
    let beacon = map.submit_form(at(800)).expect("beacon is created");

    assert_eq!(beacon.lat, 1.0);
    assert_eq!(beacon.lng, 2.0);
    assert_eq!(beacon.label, "Lunch spot");
    assert!(map.form().is_none());
    assert_eq!(map.status(at(800)), Some("Beacon added"));
    assert!(map.engine().open_popups().is_empty());

    let stored = storage
        .get(BEACON_STORAGE_KEY)
        .expect("storage is readable")
        .expect("beacons are persisted");
    assert!(stored.contains("Lunch spot"));

    let key = MarkerKey::Beacon(beacon.id.clone());
    let marker = map.engine().marker(&key).expect("marker is placed");
    assert_eq!(marker.title.as_deref(), Some("Lunch spot"));

    let marker_screen = map.engine().project(&location);
    let outcomes = map.handle_pointer(
        PointerEvent::down(MouseButton::Right, marker_screen),
        at(5_000),
    );
    assert_eq!(outcomes, vec![GestureOutcome::RemoveMarker { key: key.clone() }]);

    assert!(map.beacons().is_empty());
    assert!(!map.engine().has_marker(&key));
    assert_eq!(map.status(at(5_000)), Some("Beacon removed"));
    assert_eq!(
        storage.get(BEACON_STORAGE_KEY).expect("storage is readable"),
        Some("[]".to_string())
    );
}

#[test]
fn moving_finger_does_not_open_form() {
    let mut map = live_map(MemoryStorage::new());
    let location = latlon!(1.0, 2.0);

    map.handle_pointer(
        PointerEvent::down(MouseButton::Left, screen(100.0, 100.0)).at(location),
        at(0),
    );
    let outcomes = map.handle_pointer(PointerEvent::moved(screen(108.0, 100.0)), at(100));
    assert_matches!(outcomes[..], [GestureOutcome::Cancelled { .. }]);

    assert!(!map.tick(at(1_000)));
    assert!(map.form().is_none());
}

#[test]
fn escape_closes_form_without_beacon() {
    let mut map = live_map(MemoryStorage::new());
    map.handle_pointer(
        PointerEvent::down(MouseButton::Left, screen(100.0, 100.0)).at(latlon!(5.0, 5.0)),
        at(0),
    );
    assert!(map.tick(at(600)));
    assert_eq!(map.engine().open_popups().len(), 1);

    map.form_input("Not saved", at(700));
    map.form_key(FormKey::Escape, at(800));

    assert!(map.form().is_none());
    assert!(map.beacons().is_empty());
    assert!(map.engine().open_popups().is_empty());
}

#[test]
fn stored_beacons_are_shown_on_start() {
    let storage = MemoryStorage::with_entry(
        BEACON_STORAGE_KEY,
        r#"[{"id":"b-1","lat":1.0,"lng":2.0,"label":""},{"id":"b-2","lat":3.0,"lng":4.0,"label":"Home"}]"#,
    );
    let map = live_map(storage);

    assert_eq!(map.beacons().len(), 2);
    assert_eq!(map.engine().marker_count(), 2);
    let titles: Vec<_> = map
        .beacons()
        .iter()
        .filter_map(|b| map.engine().marker(&MarkerKey::Beacon(b.id.clone())))
        .filter_map(|m| m.title.clone())
        .collect();
    assert_eq!(titles, vec!["Beacon".to_string(), "Home".to_string()]);
}

#[test]
fn overlays_survive_style_switch() {
    let mut map = live_map(MemoryStorage::new());

    assert!(map.toggle_terrain(at(0)));
    assert_eq!(map.status(at(0)), Some("Terrain: On"));
    assert!(map.toggle_traffic(at(10)));
    assert!(map.toggle_buildings(at(20)));
    assert!(map.engine().has_layer(ids::TRAFFIC_LAYER));
    assert!(map.engine().terrain().is_some());

    assert!(map.select_style(3, at(100)).expect("style is loaded"));
    assert_eq!(map.status(at(100)), Some("Style: Dark"));
    assert!(!map.engine().has_layer(ids::TRAFFIC_LAYER));

    let report = map.style_loaded();
    assert!(!report.is_noop());
    assert_eq!(map.state().style_index, 3);
    assert!(map.engine().has_layer(ids::TRAFFIC_LAYER));
    assert!(map.engine().has_layer(ids::BUILDINGS_LAYER));
    assert!(map.engine().has_layer(ids::SKY_LAYER));
    assert!(map.engine().terrain().is_some());

    let mutations = map.engine().mutation_count();
    assert!(map.style_loaded().is_noop());
    assert_eq!(map.engine().mutation_count(), mutations);
}

#[test]
fn unknown_style_index_is_ignored() {
    let mut map = live_map(MemoryStorage::new());
    let loads = map.engine().style_load_count();

    assert!(!map.select_style(42, at(0)).expect("nothing to load"));
    assert_eq!(map.engine().style_load_count(), loads);
    assert_eq!(map.status(at(0)), None);
}

#[test]
fn weather_without_tiles_reports_unavailable() {
    let mut map = live_map(MemoryStorage::new());

    assert!(!map.toggle_weather(at(0)));
    assert_eq!(map.status(at(0)), Some("No MetService tiles configured."));
    assert!(map.state().weather.is_none());
    assert!(!map.engine().has_layer(ids::WEATHER_LAYER));
}

#[test]
fn weather_cycles_through_configured_tiles() {
    let weather = WeatherConfig {
        tiles: [
            ("precipitation", "https://tiles.example/rain/{z}/{x}/{y}.png"),
            ("clouds", "https://tiles.example/clouds/{z}/{x}/{y}.png?style=dark"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        ..Default::default()
    };
    let config = MapConfig::default().with_weather(weather);
    let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .build()
        .expect("map is created");

    assert!(map.toggle_weather(at(0)));
    assert_eq!(map.status(at(0)), Some("Weather: Precipitation"));
    assert!(map.engine().has_layer(ids::WEATHER_LAYER));

    assert!(map.cycle_weather(at(100)));
    assert_eq!(map.weather_key(), Some("clouds"));
    assert_eq!(map.status(at(100)), Some("Weather: Clouds"));
    let selection = map.state().weather.as_ref().expect("weather is on");
    assert!(selection.tiles_url.contains("style=dark&_cb="));

    assert!(!map.toggle_weather(at(200)));
    assert_eq!(map.status(at(200)), Some("Weather: Off"));
    assert_eq!(
        map.engine()
            .layer(ids::WEATHER_LAYER)
            .map(|layer| layer.visibility()),
        Some(pinged::style::Visibility::None)
    );
}

#[test]
fn route_is_requested_from_user_position() {
    let mut map = live_map(MemoryStorage::new());
    let origin = latlon!(-36.85, 174.76);
    map.handle_fix(&LocationFix::new(origin.lat(), origin.lon(), at(0)), at(0));

    let service = FakeRouting {
        calls: Mutex::new(vec![]),
    };
    let destination = latlon!(-36.86, 174.78);
    let resolution = tokio_test::block_on(map.route_to(&service, destination, at(1_000)));

    assert_matches!(resolution, RouteResolution::Applied { ref summary, .. } if summary == "2.4 km, 7 min");
    assert_eq!(map.status(at(1_000)), Some("Route: 2.4 km, 7 min"));
    assert_eq!(service.calls.lock().len(), 1);
    assert_eq!(service.calls.lock()[0].origin, origin);
    assert!(map.engine().has_layer(ids::ROUTE_LAYER));

    map.clear_route();
    assert!(!map.engine().has_layer(ids::ROUTE_LAYER));
    assert!(!map.engine().has_source(ids::ROUTE_SOURCE));
}

#[test]
fn route_result_after_clear_is_dropped() {
    let mut map = live_map(MemoryStorage::new());
    let pending = map
        .begin_route(latlon!(-36.86, 174.78), at(0))
        .expect("valid request");
    assert_eq!(pending.request.origin, map.engine().camera().center);

    map.clear_route();
    let route = RouteGeometry {
        coordinates: vec![[174.76, -36.85], [174.78, -36.86]],
        distance_m: 100.0,
        duration_s: 60.0,
    };
    let resolution = map.resolve_route(pending.ticket, Ok(route), at(500));

    assert_eq!(resolution, RouteResolution::Superseded);
    assert!(!map.engine().has_layer(ids::ROUTE_LAYER));
}

#[test]
fn destination_popup_has_navigation_link() {
    let mut map = live_map(MemoryStorage::new());
    let destination = latlon!(-36.9, 174.8);

    map.set_destination(destination, Some("  "));

    let marker = map
        .engine()
        .marker(&MarkerKey::Destination)
        .expect("destination marker");
    assert_eq!(marker.title.as_deref(), Some("Destination"));
    assert_eq!(map.engine().camera().center, destination);

    let popups = map.engine().open_popups();
    assert_eq!(popups.len(), 1);
    assert_matches!(
        &popups[0].1.content,
        PopupContent::Info { title, lines, link: Some(link) } => {
            assert_eq!(title, "Destination");
            assert_eq!(lines, &vec!["-36.90000, 174.80000".to_string()]);
            assert_eq!(link, "https://www.google.com/maps/dir/?api=1&destination=-36.9,174.8");
        }
    );
}

#[test]
fn moved_destination_gets_new_title() {
    let mut map = live_map(MemoryStorage::new());

    map.set_destination(latlon!(-36.9, 174.8), Some("Office"));
    map.set_destination(latlon!(-36.95, 174.85), Some("Beach"));

    let marker = map
        .engine()
        .marker(&MarkerKey::Destination)
        .expect("destination marker");
    assert_eq!(marker.position, latlon!(-36.95, 174.85));
    assert_eq!(marker.title.as_deref(), Some("Beach"));
    assert_eq!(map.engine().marker_count(), 1);

    let popups = map.engine().open_popups();
    assert_eq!(popups.len(), 1);
    assert_matches!(&popups[0].1.content, PopupContent::Info { title, .. } if title == "Beach");
}

#[test]
fn tap_on_beacon_shows_its_popup() {
    let mut map = live_map(MemoryStorage::new());
    let center = map.engine().camera().center;
    let beacon = map.add_beacon(center, "", at(0)).expect("valid position");
    let key = MarkerKey::Beacon(beacon.id);

    let point = screen(400.0, 300.0);
    map.handle_pointer(PointerEvent::down(MouseButton::Left, point), at(100));
    let outcomes = map.handle_pointer(PointerEvent::up(MouseButton::Left, point), at(150));

    assert_eq!(outcomes, vec![GestureOutcome::Tap { key }]);
    let popups = map.engine().open_popups();
    assert_eq!(popups.len(), 1);
    assert_matches!(&popups[0].1.content, PopupContent::Info { title, .. } if title == "Beacon");
}

#[test]
fn coordinates_are_copied() {
    let clipboard = MemoryClipboard::new();
    let config = MapConfig::default();
    let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .with_clipboard(clipboard.clone())
        .build()
        .expect("map is created");

    map.copy_coordinates(latlon!(1.0, 2.123456), at(0))
        .expect("clipboard is available");
    assert_eq!(clipboard.contents().as_deref(), Some("1.00000, 2.12346"));
    assert_eq!(map.status(at(0)), Some("Coordinates copied"));

    let mut map = live_map(MemoryStorage::new());
    assert!(map.copy_coordinates(latlon!(1.0, 2.0), at(0)).is_err());
    assert_eq!(map.status(at(0)), Some("Could not copy coordinates"));
}

#[test]
fn empty_style_catalogue_fails_to_start() {
    let config = MapConfig::default().with_styles(vec![]);
    let result = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&[]))
        .with_config(config)
        .build();

    assert!(result.is_err());
}
