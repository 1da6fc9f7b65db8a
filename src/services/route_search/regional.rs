use super::geodesy::haversine_meters;
use crate::constants::{OSLO_REFERENCE_LAT, OSLO_REFERENCE_LNG, REGIONAL_RADIUS_M};
use crate::models::{Candidate, CandidateSource, Point};
use serde::{Deserialize, Serialize};

/// A hand-authored loop known to walk well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateLoop {
    pub name: String,
    /// Rough walking length from the region center, meters
    pub approx_meters: f64,
    pub waypoints: Vec<Point>,
}

/// An area with curated loops, used when generated candidates all miss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRegion {
    pub name: String,
    pub center: Point,
    pub radius_m: f64,
    pub loops: Vec<TemplateLoop>,
}

impl ReferenceRegion {
    pub fn contains(&self, point: Point) -> bool {
        haversine_meters(self.center, point) <= self.radius_m
    }

    /// Template candidates ordered by closeness of their length to the target.
    pub fn candidates_for(&self, target_meters: f64, limit: usize) -> Vec<Candidate> {
        let mut loops: Vec<&TemplateLoop> = self.loops.iter().collect();
        loops.sort_by(|a, b| {
            (a.approx_meters - target_meters)
                .abs()
                .total_cmp(&(b.approx_meters - target_meters).abs())
        });

        loops
            .into_iter()
            .take(limit)
            .map(|l| {
                Candidate::new(
                    l.waypoints.clone(),
                    CandidateSource::Template {
                        name: l.name.clone(),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionalTemplates {
    regions: Vec<ReferenceRegion>,
}

impl RegionalTemplates {
    pub fn new(regions: Vec<ReferenceRegion>) -> Self {
        RegionalTemplates { regions }
    }

    /// No regions: the regional fallback never applies.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::new(vec![oslo()])
    }

    pub fn regions(&self) -> &[ReferenceRegion] {
        &self.regions
    }

    /// The closest region whose radius covers `start`.
    pub fn region_for(&self, start: Point) -> Option<&ReferenceRegion> {
        self.regions
            .iter()
            .filter(|r| r.contains(start))
            .min_by(|a, b| {
                haversine_meters(a.center, start).total_cmp(&haversine_meters(b.center, start))
            })
    }
}

fn template(name: &str, approx_meters: f64, waypoints: &[(f64, f64)]) -> TemplateLoop {
    TemplateLoop {
        name: name.to_string(),
        approx_meters,
        waypoints: waypoints
            .iter()
            .map(|&(lat, lng)| Point { lat, lng })
            .collect(),
    }
}

fn oslo() -> ReferenceRegion {
    ReferenceRegion {
        name: "Oslo".to_string(),
        center: Point {
            lat: OSLO_REFERENCE_LAT,
            lng: OSLO_REFERENCE_LNG,
        },
        radius_m: REGIONAL_RADIUS_M,
        loops: vec![
            template(
                "Aker brygge og Akershus",
                3_200.0,
                &[(59.9103, 10.7290), (59.9075, 10.7370)],
            ),
            template(
                "St. Hanshaugen",
                3_700.0,
                &[(59.9231, 10.7362), (59.9270, 10.7405)],
            ),
            template(
                "Frognerparken",
                4_200.0,
                &[(59.9215, 10.7050), (59.9270, 10.7005), (59.9240, 10.7160)],
            ),
            template(
                "Akerselva",
                5_200.0,
                &[(59.9226, 10.7573), (59.9345, 10.7555), (59.9290, 10.7480)],
            ),
            template(
                "Ekebergåsen",
                5_600.0,
                &[(59.8990, 10.7640), (59.8930, 10.7700), (59.9010, 10.7760)],
            ),
            template(
                "Bygdøy",
                8_500.0,
                &[(59.9105, 10.7090), (59.9050, 10.6840), (59.9000, 10.6800)],
            ),
        ],
    }
}
