use super::geodesy::{destination_point, normalize_bearing};
use crate::constants::*;
use crate::models::{Candidate, CandidateSource, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Geometric loops for when the walkable network is unknown.
///
/// Waypoints sit on a circle around the start, fanned out over an arc so the
/// walk out, across and back approximates the target. Each candidate rotates
/// and jitters the fan so the batch covers different directions.
pub struct FallbackLoopGenerator {
    seed: Option<u64>,
}

impl FallbackLoopGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        FallbackLoopGenerator { seed }
    }

    /// Starting bearing for a round. Seeded generators repeat per round.
    pub fn base_bearing(&self, round: usize) -> f64 {
        let random: f64 = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(round as u64))
                .random_range(0.0..360.0),
            None => rand::rng().random_range(0.0..360.0),
        };
        normalize_bearing(random + round as f64 * FALLBACK_ROUND_ROTATION_DEG)
    }

    pub fn generate(
        &self,
        start: Point,
        target_meters: f64,
        round: usize,
        waypoint_count: usize,
        count: usize,
    ) -> Vec<Candidate> {
        let base = self.base_bearing(round);
        fallback_candidates(start, target_meters, base, waypoint_count, count)
    }
}

/// Circle radius whose out-across-back polygon, inflated by the expected
/// street detour, matches the target.
pub fn fallback_radius(target_meters: f64, waypoint_count: usize) -> f64 {
    let n = waypoint_count.max(1) as f64;
    let step = (360.0 / (n + 1.0)).to_radians();
    let perimeter_factor = 2.0 + (n - 1.0) * 2.0 * (step / 2.0).sin();
    (target_meters / (FALLBACK_DETOUR_FACTOR * perimeter_factor)).max(FALLBACK_MIN_RADIUS_M)
}

/// `count` fanned loops starting at `base_bearing`.
pub fn fallback_candidates(
    start: Point,
    target_meters: f64,
    base_bearing: f64,
    waypoint_count: usize,
    count: usize,
) -> Vec<Candidate> {
    let n = waypoint_count.max(1);
    let radius = fallback_radius(target_meters, n);
    let ideal_spacing = 360.0 / (n as f64 + 1.0);

    (0..count)
        .map(|i| {
            let spacing = ideal_spacing + ((i % 5) as f64 - 2.0) * FALLBACK_SPACING_JITTER_DEG;
            let radius_i = radius * (1.0 - (i % 3) as f64 * FALLBACK_RADIUS_JITTER);
            let first = base_bearing + i as f64 * FALLBACK_CANDIDATE_ROTATION_DEG;

            let waypoints = (0..n)
                .map(|k| {
                    destination_point(start, radius_i, normalize_bearing(first + k as f64 * spacing))
                })
                .collect();
            Candidate::new(waypoints, CandidateSource::Fallback)
        })
        .collect()
}
