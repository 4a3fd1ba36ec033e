use async_trait::async_trait;
use log::{debug, info};
use pinged_types::geo::GeoPoint;
use serde::Deserialize;

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::route::{RouteGeometry, RouteRequest, RoutingService};

/// Client of a Mapbox Directions v5 compatible routing service.
#[derive(Debug, Clone)]
pub struct DirectionsClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DirectionsClient {
    /// Creates a new client.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, RoutingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("pinged/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Creates a client for the configured service.
    pub fn from_config(config: &RoutingConfig, access_token: &str) -> Result<Self, RoutingError> {
        Self::new(&config.base_url, access_token)
    }

    /// Url of the request. Geometry is requested as a full-resolution GeoJSON line.
    pub fn request_url(&self, request: &RouteRequest) -> String {
        format!(
            "{}/mapbox/{}/{},{};{},{}?geometries=geojson&overview=full&access_token={}",
            self.base_url,
            request.profile.as_str(),
            request.origin.lon(),
            request.origin.lat(),
            request.destination.lon(),
            request.destination.lat(),
            self.access_token
        )
    }
}

#[async_trait]
impl RoutingService for DirectionsClient {
    async fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
        let url = self.request_url(request);
        debug!("Sending directions request to {}", self.base_url);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // The service reports "no route" with a 4xx status and a json body, so parse it first.
        match parse_directions_response(&body) {
            Err(RoutingError::Decoding(_)) if !status.is_success() => {
                info!("Directions request failed with status {status}");
                Err(RoutingError::Status(status.as_u16()))
            }
            result => result,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    geometry: geojson::Geometry,
    distance: f64,
    duration: f64,
}

/// Parses the body of a Directions v5 response. The first route of the response is used.
pub fn parse_directions_response(body: &str) -> Result<RouteGeometry, RoutingError> {
    let response: DirectionsResponse = serde_json::from_str(body)?;
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NoRoute),
        code => {
            return Err(RoutingError::Decoding(
                response.message.unwrap_or_else(|| code.to_string()),
            ))
        }
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRoute)?;

    let geojson::Value::LineString(line) = route.geometry.value else {
        return Err(RoutingError::Decoding(
            "route geometry is not a line string".to_string(),
        ));
    };

    let coordinates = line
        .into_iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok([*lon, *lat]),
            _ => Err(RoutingError::Decoding(
                "route position has less than 2 coordinates".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RouteGeometry {
        coordinates,
        distance_m: route.distance,
        duration_s: route.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::TravelProfile;
    use assert_matches::assert_matches;
    use pinged_types::latlon;

    #[test]
    fn request_url() {
        let client = DirectionsClient::new("https://api.mapbox.com/directions/v5/", "token").unwrap();
        let request = RouteRequest {
            origin: latlon!(-36.85, 174.76),
            destination: latlon!(-36.9, 174.8),
            profile: TravelProfile::DrivingTraffic,
        };

        assert_eq!(
            client.request_url(&request),
            "https://api.mapbox.com/directions/v5/mapbox/driving-traffic/174.76,-36.85;174.8,-36.9?geometries=geojson&overview=full&access_token=token"
        );
    }

    #[test]
    fn parse_ok_response() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "geometry": {"type": "LineString", "coordinates": [[174.76, -36.85], [174.78, -36.87]]},
                "distance": 3120.5,
                "duration": 480.2,
                "legs": []
            }],
            "waypoints": []
        }"#;

        let route = parse_directions_response(body).unwrap();
        assert_eq!(route.coordinates, vec![[174.76, -36.85], [174.78, -36.87]]);
        assert_eq!(route.distance_m, 3120.5);
        assert_eq!(route.duration_s, 480.2);
    }

    #[test]
    fn parse_no_route() {
        assert_eq!(
            parse_directions_response(r#"{"code": "NoRoute", "message": "No route found"}"#),
            Err(RoutingError::NoRoute)
        );
        assert_eq!(
            parse_directions_response(r#"{"code": "Ok", "routes": []}"#),
            Err(RoutingError::NoRoute)
        );
    }

    #[test]
    fn parse_errors() {
        assert_matches!(
            parse_directions_response("<html>"),
            Err(RoutingError::Decoding(_))
        );
        assert_eq!(
            parse_directions_response(r#"{"code": "InvalidInput", "message": "Bad coordinates"}"#),
            Err(RoutingError::Decoding("Bad coordinates".to_string()))
        );
        assert_matches!(
            parse_directions_response(
                r#"{"code": "Ok", "routes": [{"geometry": {"type": "Point", "coordinates": [1, 2]}, "distance": 1, "duration": 1}]}"#
            ),
            Err(RoutingError::Decoding(_))
        );
    }
}
