use super::fallback_loop::FallbackLoopGenerator;
use super::network_waypoints::network_candidates;
use crate::models::{Candidate, Point};
use std::collections::HashSet;

/// Builds one round's candidate pool: network-derived loops first, then
/// geometric fallbacks, deduplicated and capped.
pub struct CandidateGenerator {
    max_candidates: usize,
    fallback: FallbackLoopGenerator,
}

impl CandidateGenerator {
    pub fn new(max_candidates: usize, seed: Option<u64>) -> Self {
        CandidateGenerator {
            max_candidates,
            fallback: FallbackLoopGenerator::new(seed),
        }
    }

    pub fn generate(
        &self,
        start: Point,
        target_meters: f64,
        walkable: &[Point],
        round: usize,
        waypoint_count: usize,
    ) -> Vec<Candidate> {
        let network = network_candidates(
            start,
            target_meters,
            walkable,
            round,
            waypoint_count,
            self.max_candidates,
        );
        let network_count = network.len();
        let fallback = self.fallback.generate(
            start,
            target_meters,
            round,
            waypoint_count,
            self.max_candidates,
        );

        let pool = dedup_candidates(network.into_iter().chain(fallback), self.max_candidates);

        tracing::debug!(
            round = round + 1,
            network = network_count,
            pool = pool.len(),
            "Candidate pool for round {}: {} total ({} from walkable network)",
            round + 1,
            pool.len(),
            network_count
        );

        pool
    }
}

/// First occurrence of each waypoint key wins; at most `max` are kept.
pub fn dedup_candidates<I>(candidates: I, max: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.waypoints.is_empty() && seen.insert(c.key()))
        .take(max)
        .collect()
}
