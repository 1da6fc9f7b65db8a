use crate::constants::{CANDIDATE_KEY_PRECISION, METERS_PER_STEP};
use crate::models::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a candidate's waypoints came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CandidateSource {
    /// Picked from sampled walkable-network points
    Network,
    /// Synthesized on a circle around the start
    Fallback,
    /// A hand-authored loop of a reference region
    Template { name: String },
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Network => write!(f, "network"),
            CandidateSource::Fallback => write!(f, "fallback"),
            CandidateSource::Template { name } => write!(f, "template:{}", name),
        }
    }
}

/// A proposed set of intermediate stops, not yet routed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub waypoints: Vec<Point>,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(waypoints: Vec<Point>, source: CandidateSource) -> Self {
        Candidate { waypoints, source }
    }

    /// Dedup identity: waypoints rounded to 4 decimals, in visiting order.
    pub fn key(&self) -> String {
        self.waypoints
            .iter()
            .map(|p| p.key(CANDIDATE_KEY_PRECISION))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Full request sequence: start, waypoints, start.
    pub fn loop_coordinates(&self, start: Point) -> Vec<Point> {
        let mut coords = Vec::with_capacity(self.waypoints.len() + 2);
        coords.push(start);
        coords.extend(self.waypoints.iter().copied());
        coords.push(start);
        coords
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// `[lng, lat]`
    pub location: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStep {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub name: String,
    pub maneuver: Maneuver,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteLeg {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

/// A routed loop as returned by the routing provider, before any candidate
/// bookkeeping is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteGeometry {
    pub meters: f64,
    pub seconds: f64,
    /// GeoJSON coordinates as `[lng, lat]` pairs
    pub geometry: Vec<[f64; 2]>,
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub id: Uuid,
    pub meters: f64,
    pub seconds: f64,
    /// GeoJSON coordinates as `[lng, lat]` pairs
    pub geometry: Vec<[f64; 2]>,
    pub legs: Vec<RouteLeg>,
    pub waypoints: Vec<Point>,
    pub source: CandidateSource,
    /// Content fingerprint used for novelty filtering
    pub hash: String,
}

impl RouteResult {
    pub fn distance_km(&self) -> f64 {
        self.meters / 1000.0
    }

    pub fn estimated_steps(&self) -> u32 {
        (self.meters / METERS_PER_STEP).round() as u32
    }
}

/// A route together with how well it fits the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRoute {
    pub route: RouteResult,
    /// Lower is better
    pub score: f64,
    /// Absolute distance from the target, meters
    pub diff_meters: f64,
    pub backtrack_ratio: f64,
}
