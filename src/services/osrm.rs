use crate::constants::{DEFAULT_OSRM_BASE_URL, DEFAULT_OSRM_PROFILE, DEFAULT_ROUTING_TIMEOUT_MS};
use crate::error::{AppError, Result};
use crate::models::{Point, RouteGeometry, RouteLeg};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Pedestrian routing collaborator.
///
/// `Ok(None)` means the provider answered but found no route; `Err` is a
/// transport or HTTP-level failure.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route_through(&self, coordinates: &[Point]) -> Result<Option<RouteGeometry>>;
}

#[derive(Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
    profile: String,
    timeout: Duration,
}

impl OsrmClient {
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_OSRM_BASE_URL.to_string(),
            DEFAULT_OSRM_PROFILE.to_string(),
            Duration::from_millis(DEFAULT_ROUTING_TIMEOUT_MS),
        )
    }

    pub fn with_config(base_url: String, profile: String, timeout: Duration) -> Self {
        OsrmClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            profile,
            timeout,
        }
    }

    fn route_url(&self, coordinates: &[Point]) -> String {
        // Format coordinates as "lng,lat;lng,lat;..."
        let coordinates_str = coordinates
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}",
            self.base_url, self.profile, coordinates_str
        )
    }
}

impl Default for OsrmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoutingProvider for OsrmClient {
    async fn route_through(&self, coordinates: &[Point]) -> Result<Option<RouteGeometry>> {
        if coordinates.len() < 2 {
            return Err(AppError::InvalidRequest(
                "At least 2 coordinates required".to_string(),
            ));
        }

        let url = self.route_url(coordinates);

        tracing::debug!(
            coordinates = coordinates.len(),
            profile = %self.profile,
            "OSRM request: {} coordinates, profile {}",
            coordinates.len(),
            self.profile
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("overview", "full"),
                ("geometries", "geojson"),
                ("steps", "true"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::RoutingApi("Request timed out".to_string())
                } else {
                    AppError::RoutingApi(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // OSRM reports unroutable input as HTTP 400 with a NoRoute code
            if is_no_route_body(&error_text) {
                tracing::debug!(
                    coordinates = coordinates.len(),
                    "OSRM found no route for {} coordinates",
                    coordinates.len()
                );
                return Ok(None);
            }

            tracing::warn!(
                status = %status,
                coordinates = coordinates.len(),
                "OSRM HTTP error {}: {}",
                status,
                error_text
            );
            return Err(AppError::RoutingApi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: OsrmRouteResponse = response
            .json()
            .await
            .map_err(|e| AppError::RoutingApi(format!("Failed to parse response: {}", e)))?;

        Ok(body.into_geometry())
    }
}

// OSRM API response types

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64, // meters
    duration: f64, // seconds
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat] pairs
}

fn is_no_route_body(body: &str) -> bool {
    serde_json::from_str::<OsrmRouteResponse>(body)
        .map(|r| r.code == "NoRoute" || r.code == "NoSegment")
        .unwrap_or(false)
}

impl OsrmRouteResponse {
    fn into_geometry(self) -> Option<RouteGeometry> {
        if self.code != "Ok" {
            tracing::debug!(code = %self.code, "OSRM returned code {}", self.code);
            return None;
        }

        let route = self.routes.into_iter().next()?;
        tracing::debug!(
            distance_km = %format!("{:.2}", route.distance / 1000.0),
            duration_min = %format!("{:.0}", route.duration / 60.0),
            path_points = route.geometry.coordinates.len(),
            "OSRM response: {:.2}km, {:.0}min, {} path points",
            route.distance / 1000.0,
            route.duration / 60.0,
            route.geometry.coordinates.len()
        );

        Some(RouteGeometry {
            meters: route.distance,
            seconds: route.duration,
            geometry: route.geometry.coordinates,
            legs: route.legs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_url_uses_lng_lat_order() {
        let client = OsrmClient::with_config(
            "http://localhost:5000/".to_string(),
            "foot".to_string(),
            Duration::from_secs(1),
        );
        let coords = vec![
            Point::new(59.9139, 10.7522).unwrap(),
            Point::new(59.92, 10.76).unwrap(),
            Point::new(59.9139, 10.7522).unwrap(),
        ];
        assert_eq!(
            client.route_url(&coords),
            "http://localhost:5000/route/v1/foot/10.7522,59.9139;10.76,59.92;10.7522,59.9139"
        );
    }

    #[test]
    fn parses_route_with_steps() {
        let json = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 3012.4,
                "duration": 2170.0,
                "geometry": {"type": "LineString", "coordinates": [[10.75, 59.91], [10.76, 59.92], [10.75, 59.91]]},
                "legs": [{
                    "distance": 1500.0,
                    "duration": 1080.0,
                    "summary": "",
                    "steps": [{
                        "distance": 1500.0,
                        "duration": 1080.0,
                        "name": "Akersgata",
                        "maneuver": {"type": "depart", "location": [10.75, 59.91], "bearing_after": 10}
                    }]
                }]
            }],
            "waypoints": []
        }"#;
        let response: OsrmRouteResponse = serde_json::from_str(json).unwrap();
        let geometry = response.into_geometry().unwrap();

        assert_eq!(geometry.meters, 3012.4);
        assert_eq!(geometry.geometry.len(), 3);
        assert_eq!(geometry.legs.len(), 1);
        assert_eq!(geometry.legs[0].steps[0].maneuver.kind, "depart");
        assert!(geometry.legs[0].steps[0].maneuver.modifier.is_none());
    }

    #[test]
    fn no_route_is_none() {
        let response: OsrmRouteResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();
        assert!(response.into_geometry().is_none());

        let response: OsrmRouteResponse =
            serde_json::from_str(r#"{"code": "Ok", "routes": []}"#).unwrap();
        assert!(response.into_geometry().is_none());
    }

    #[test]
    fn no_route_error_body_detection() {
        assert!(is_no_route_body(
            r#"{"code": "NoRoute", "message": "Impossible route between points"}"#
        ));
        assert!(!is_no_route_body(
            r#"{"code": "InvalidQuery", "message": "Query string malformed"}"#
        ));
        assert!(!is_no_route_body("<html>Bad Gateway</html>"));
    }
}
