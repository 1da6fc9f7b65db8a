use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::Point;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Source of pedestrian-accessible points around a location.
#[async_trait]
pub trait WalkableSource: Send + Sync {
    async fn walkable_points(&self, center: Point, radius_m: f64) -> Result<Vec<Point>>;
}

#[derive(Clone)]
pub struct OverpassClient {
    client: Client,
    /// Tried in order; the first endpoint returning points wins
    endpoints: Vec<String>,
    timeout: Duration,
    max_ways: usize,
}

impl OverpassClient {
    pub fn new() -> Self {
        Self::with_endpoints(
            DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            Duration::from_millis(DEFAULT_OVERPASS_TIMEOUT_MS),
        )
    }

    pub fn with_endpoints(endpoints: Vec<String>, timeout: Duration) -> Self {
        OverpassClient {
            client: Client::new(),
            endpoints,
            timeout,
            max_ways: SAMPLER_MAX_WAYS,
        }
    }

    fn build_query(&self, center: Point, radius_m: f64) -> String {
        let timeout_secs = self.timeout.as_secs().max(1);
        format!(
            "[out:json][timeout:{}];\n\
             way(around:{:.0},{},{})[\"highway\"~\"^({})$\"][\"access\"!~\"^(private|no)$\"][\"foot\"!=\"no\"];\n\
             out center {};",
            timeout_secs,
            radius_m,
            center.lat,
            center.lng,
            WALKABLE_HIGHWAYS.join("|"),
            self.max_ways
        )
    }

    async fn query_endpoint(&self, endpoint: &str, query: &str) -> Result<Vec<Point>> {
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("data={}", urlencoding::encode(query)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::OverpassApi("Request timed out".to_string())
                } else {
                    AppError::OverpassApi(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::OverpassApi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let api_response: OverpassResponse = response
            .json()
            .await
            .map_err(|e| AppError::OverpassApi(format!("Failed to parse response: {}", e)))?;

        Ok(convert_elements_to_points(api_response.elements))
    }
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalkableSource for OverpassClient {
    async fn walkable_points(&self, center: Point, radius_m: f64) -> Result<Vec<Point>> {
        let query = self.build_query(center, radius_m);
        tracing::debug!("Overpass walkable query: {}", query);

        let mut last_error = None;

        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            match self.query_endpoint(endpoint, &query).await {
                Ok(points) if !points.is_empty() => {
                    tracing::info!(
                        endpoint = %endpoint,
                        points = points.len(),
                        radius_m = %format!("{:.0}", radius_m),
                        "Fetched {} walkable points within {:.0}m from {}",
                        points.len(),
                        radius_m,
                        endpoint
                    );
                    return Ok(points);
                }
                Ok(_) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt = idx + 1,
                        "Overpass endpoint {} returned 0 walkable points",
                        endpoint
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt = idx + 1,
                        error = %e,
                        "Overpass endpoint {} failed: {}",
                        endpoint,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

fn convert_elements_to_points(elements: Vec<OverpassElement>) -> Vec<Point> {
    elements
        .into_iter()
        .filter(|elem| {
            elem.tags
                .get("highway")
                .is_some_and(|h| WALKABLE_HIGHWAYS.contains(&h.as_str()))
        })
        .filter(|elem| {
            !matches!(
                elem.tags.get("access").map(String::as_str),
                Some("private") | Some("no")
            )
        })
        .filter_map(|elem| {
            // Ways carry a center; plain nodes carry lat/lon directly
            let (lat, lon) = match (elem.center, elem.lat, elem.lon) {
                (Some(center), _, _) => (center.lat, center.lon),
                (None, Some(lat), Some(lon)) => (lat, lon),
                _ => return None,
            };
            Point::new(lat, lon).ok()
        })
        .collect()
}

// Overpass API response types

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}
