//! Requests a route from the Mapbox Directions service and shows it on the map.
//!
//! Set `PINGED_ACCESS_TOKEN` to a Mapbox access token before running.

use pinged::engine::HeadlessEngine;
use pinged::fix::LocationFix;
use pinged::pinged_types::latlon;
use pinged::route::{DirectionsClient, RouteResolution};
use pinged::{LiveMapBuilder, MapConfig, RenderEngine};
use web_time::SystemTime;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Ok(token) = std::env::var("PINGED_ACCESS_TOKEN") else {
        eprintln!("PINGED_ACCESS_TOKEN is not set");
        return;
    };

    let config = MapConfig::default().with_access_token(token);
    let client = DirectionsClient::from_config(&config.routing, &config.access_token)
        .expect("failed to create http client");
    let mut map = LiveMapBuilder::new(HeadlessEngine::with_basemaps(&config.styles))
        .with_config(config)
        .build()
        .expect("failed to initialize");

    let now = SystemTime::now();
    map.handle_fix(&LocationFix::new(-36.8485, 174.7633, now), now);

    let destination = latlon!(-36.8606, 174.7771);
    map.set_destination(destination, Some("Domain"));

    match map.route_to(&client, destination, SystemTime::now()).await {
        RouteResolution::Applied { summary, report } => {
            println!(
                "Route: {summary} ({} engine changes), camera {:?}",
                report.mutations,
                map.engine().camera()
            );
        }
        RouteResolution::Failed(err) => println!("Route request failed: {err}"),
        RouteResolution::Superseded => println!("Route request was superseded"),
    }
}
