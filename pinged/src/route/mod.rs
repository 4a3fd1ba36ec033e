//! Route between two points, fetched from an external routing service and drawn as a single
//! managed overlay.

use async_trait::async_trait;
use geojson::{Feature, GeoJson, Geometry, JsonObject};
use log::{info, warn};
use maybe_sync::{MaybeSend, MaybeSync};
use pinged_types::geo::{GeoBounds, GeoPoint, GeoPoint2d, NewGeoPoint};
use serde::{Deserialize, Serialize};

use crate::engine::RenderEngine;
use crate::error::RoutingError;
use crate::layer::{LayerReconciler, ReconcileReport, VisualLayerState};

#[cfg(not(target_arch = "wasm32"))]
mod directions;

#[cfg(not(target_arch = "wasm32"))]
pub use directions::{parse_directions_response, DirectionsClient};

/// Mode of travel for route requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TravelProfile {
    /// Car, ignoring current traffic.
    #[default]
    Driving,
    /// Car, taking current traffic into account.
    DrivingTraffic,
    /// Pedestrian.
    Walking,
    /// Bicycle.
    Cycling,
}

impl TravelProfile {
    /// Name of the profile in routing service urls.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelProfile::Driving => "driving",
            TravelProfile::DrivingTraffic => "driving-traffic",
            TravelProfile::Walking => "walking",
            TravelProfile::Cycling => "cycling",
        }
    }
}

/// Route returned by the routing service.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// Points of the route line as `[lon, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    /// Length of the route in meters.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub duration_s: f64,
}

impl RouteGeometry {
    /// Bounding box of the route line. `None` if the route has no points.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let points: Vec<GeoPoint2d> = self
            .coordinates
            .iter()
            .map(|[lon, lat]| GeoPoint2d::lonlat(*lon, *lat))
            .collect();
        GeoBounds::from_points(points.iter())
    }

    /// Route as a GeoJSON feature with a line string geometry and `distance`/`duration`
    /// properties.
    pub fn to_geojson(&self) -> GeoJson {
        let line = self.coordinates.iter().map(|c| c.to_vec()).collect();
        let mut properties = JsonObject::new();
        properties.insert("distance".into(), self.distance_m.into());
        properties.insert("duration".into(), self.duration_s.into());

        GeoJson::Feature(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::LineString(line))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }

    /// Short human readable description, e.g. `12.3 km, 17 min`.
    pub fn summary(&self) -> String {
        let distance = if self.distance_m < 1000.0 {
            format!("{:.0} m", self.distance_m)
        } else {
            format!("{:.1} km", self.distance_m / 1000.0)
        };

        let minutes = (self.duration_s / 60.0).round().max(1.0) as u64;
        let duration = if minutes < 60 {
            format!("{minutes} min")
        } else {
            format!("{} h {} min", minutes / 60, minutes % 60)
        };

        format!("{distance}, {duration}")
    }
}

/// Route request parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RouteRequest {
    /// Start of the route.
    pub origin: GeoPoint2d,
    /// End of the route.
    pub destination: GeoPoint2d,
    /// Mode of travel.
    pub profile: TravelProfile,
}

/// External routing service.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RoutingService: MaybeSend + MaybeSync {
    /// Finds a route. Called once per request, without retries.
    async fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError>;
}

/// Identifies a route request issued by [`RouteOverlay::begin`]. Later requests have greater
/// tickets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteTicket(u64);

/// What happened to the result of a route request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResolution {
    /// The route is now active and shown.
    Applied {
        /// Description of the route.
        summary: String,
        /// Engine mutations made to show the route.
        report: ReconcileReport,
    },
    /// A newer request was already applied, or the route was cleared after this request was
    /// issued. The result was dropped.
    Superseded,
    /// The request failed. The active route was left untouched.
    Failed(RoutingError),
}

const DEFAULT_FIT_PADDING: f64 = 60.0;

/// Manages the single active route.
///
/// The network call is done outside of the overlay, so the rest of the map stays usable while
/// the request is in flight:
/// 1. [`RouteOverlay::begin`] validates the endpoints and issues a ticket;
/// 2. [`RouteOverlay::fetch`] calls the routing service;
/// 3. [`RouteOverlay::resolve`] applies the result to the state and the engine as they are at
///    that moment.
#[derive(Debug, Clone)]
pub struct RouteOverlay {
    fit_padding: f64,
    issued: u64,
    stale_below: u64,
}

impl Default for RouteOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_FIT_PADDING)
    }
}

impl RouteOverlay {
    /// Creates an overlay that fits routes into the viewport with the given padding in pixels.
    pub fn new(fit_padding: f64) -> Self {
        Self {
            fit_padding,
            issued: 0,
            stale_below: 0,
        }
    }

    /// Padding used to fit the route into the viewport.
    pub fn fit_padding(&self) -> f64 {
        self.fit_padding
    }

    /// Starts a new request.
    pub fn begin(
        &mut self,
        origin: GeoPoint2d,
        destination: GeoPoint2d,
        profile: TravelProfile,
    ) -> Result<(RouteTicket, RouteRequest), RoutingError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RoutingError::InvalidRequest);
        }

        self.issued += 1;
        Ok((
            RouteTicket(self.issued),
            RouteRequest {
                origin,
                destination,
                profile,
            },
        ))
    }

    /// Calls the routing service once. A route without points is reported as
    /// [`RoutingError::NoRoute`].
    pub async fn fetch(
        service: &(impl RoutingService + ?Sized),
        request: &RouteRequest,
    ) -> Result<RouteGeometry, RoutingError> {
        info!(
            "Requesting {} route from {:?} to {:?}",
            request.profile.as_str(),
            request.origin,
            request.destination
        );
        let route = service.route(request).await?;
        if route.coordinates.len() < 2 {
            return Err(RoutingError::NoRoute);
        }

        Ok(route)
    }

    /// Applies the result of a request.
    ///
    /// On success the route replaces the active one, is drawn by the reconciler and the viewport
    /// is fitted to it. Results of requests older than the applied one or issued before the last
    /// [`RouteOverlay::clear`] are dropped.
    pub fn resolve<E: RenderEngine + ?Sized>(
        &mut self,
        ticket: RouteTicket,
        result: Result<RouteGeometry, RoutingError>,
        state: &mut VisualLayerState,
        reconciler: &LayerReconciler,
        engine: &mut E,
    ) -> RouteResolution {
        if ticket.0 < self.stale_below {
            info!("Dropped result of superseded route request {}", ticket.0);
            return RouteResolution::Superseded;
        }

        let route = match result {
            Ok(route) => route,
            Err(err) => {
                warn!("Route request failed: {err}");
                return RouteResolution::Failed(err);
            }
        };

        self.stale_below = ticket.0;
        let summary = route.summary();
        let bounds = route.bounds();
        state.active_route = Some(route);

        let report = reconciler.reconcile(state, engine);
        if let Some(bounds) = bounds {
            engine.fit_bounds(bounds, self.fit_padding);
        }

        info!("Route applied: {summary}");
        RouteResolution::Applied { summary, report }
    }

    /// Removes the active route.
    pub fn clear<E: RenderEngine + ?Sized>(
        &mut self,
        state: &mut VisualLayerState,
        reconciler: &LayerReconciler,
        engine: &mut E,
    ) -> ReconcileReport {
        // Results of requests issued before clearing must not bring the route back.
        self.stale_below = self.issued + 1;
        state.active_route = None;
        reconciler.reconcile(state, engine)
    }
}
