//! Replays a short walk through the simulated location sensor, drops a beacon with a long press
//! and prints what the map does along the way.

use std::time::Duration;

use pinged::beacon::MemoryStorage;
use pinged::control::{ManualScheduler, MouseButton, PointerEvent};
use pinged::engine::HeadlessEngine;
use pinged::fix::LocationFix;
use pinged::geolocation::{GeolocationService, LocationQueue, SimulatedGeolocation};
use pinged::pinged_types::screen::ScreenPoint;
use pinged::{LiveMapBuilder, MapConfig, RenderEngine};
use web_time::SystemTime;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MapConfig::default();
    let scheduler = ManualScheduler::new();
    let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .with_storage(MemoryStorage::new())
        .with_scheduler(scheduler.clone())
        .build()
        .expect("failed to initialize");

    let queue = LocationQueue::new();
    let mut sensor = SimulatedGeolocation::new();
    let watch = sensor
        .watch(queue.callback())
        .expect("simulated sensor is always available");

    let start = SystemTime::now();
    let track = [
        (-36.8485, 174.7633, 0),
        (-36.8490, 174.7640, 10),
        (-36.8520, 174.7680, 30),
        (-36.8560, 174.7720, 60),
    ];
    for (lat, lon, secs) in track {
        let now = start + Duration::from_secs(secs);
        sensor.emit(Ok(LocationFix::new(lat, lon, now).with_accuracy(12.0)));

        for update in queue.drain() {
            let outcome = map.handle_location(update, now);
            println!("{secs:>3}s: {outcome:?}, center {:?}", map.engine().camera().center);
        }
    }
    sensor.clear_watch(watch);

    let now = start + Duration::from_secs(90);
    let press = ScreenPoint::new(420.0, 280.0);
    map.handle_pointer(PointerEvent::down(MouseButton::Left, press), now);
    map.handle_pointer(
        PointerEvent::moved(ScreenPoint::new(423.0, 282.0)),
        now + Duration::from_millis(200),
    );

    for (token, delay) in scheduler.take_pending() {
        map.hold_elapsed(token, now + delay);
    }

    map.form_input("Coffee\n", now + Duration::from_secs(2));
    for beacon in map.beacons() {
        println!("Beacon {} at {:.5}, {:.5}", beacon.display_label(), beacon.lat, beacon.lng);
    }
    println!("Status: {:?}", map.status(now + Duration::from_secs(2)));
}
