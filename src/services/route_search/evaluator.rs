use super::geodesy::haversine_meters;
use crate::constants::*;
use crate::error::Result;
use crate::models::{Candidate, Point, RouteResult, ScoredRoute};
use crate::services::osrm::RoutingProvider;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Fingerprint of a routed loop: first, middle and last path coordinate plus
/// the length in 50 m buckets. Loops that look alike hash alike.
pub fn route_hash(geometry: &[[f64; 2]], meters: f64) -> String {
    let bucket = (meters / ROUTE_HASH_DISTANCE_BUCKET_M).round() as i64;
    if geometry.is_empty() {
        return format!("empty|{}", bucket);
    }

    let fmt = |c: &[f64; 2]| {
        format!(
            "{:.*}|{:.*}",
            ROUTE_HASH_PRECISION, c[0], ROUTE_HASH_PRECISION, c[1]
        )
    };
    let first = &geometry[0];
    let middle = &geometry[geometry.len() / 2];
    let last = &geometry[geometry.len() - 1];

    format!("{}|{}|{}|{}", fmt(first), fmt(middle), fmt(last), bucket)
}

type SegmentKey = (i64, i64, i64, i64);

fn segment_key(a: &[f64; 2], b: &[f64; 2]) -> SegmentKey {
    let scale = 10f64.powi(BACKTRACK_SEGMENT_PRECISION);
    let ra = ((a[0] * scale).round() as i64, (a[1] * scale).round() as i64);
    let rb = ((b[0] * scale).round() as i64, (b[1] * scale).round() as i64);
    // undirected: walking a street back counts as the same segment
    let (lo, hi) = if ra <= rb { (ra, rb) } else { (rb, ra) };
    (lo.0, lo.1, hi.0, hi.1)
}

/// Share of the path that retraces segments already walked, relative to the
/// fresh part. 0 for a clean loop, 1 for a pure out-and-back.
pub fn backtrack_ratio(geometry: &[[f64; 2]]) -> f64 {
    if geometry.len() < 2 {
        return 1.0;
    }

    let mut walked: HashSet<SegmentKey> = HashSet::new();
    let mut retraced = 0.0;
    let mut fresh = 0.0;

    for pair in geometry.windows(2) {
        let length = haversine_meters(
            Point {
                lat: pair[0][1],
                lng: pair[0][0],
            },
            Point {
                lat: pair[1][1],
                lng: pair[1][0],
            },
        );
        if walked.insert(segment_key(&pair[0], &pair[1])) {
            fresh += length;
        } else {
            retraced += length;
        }
    }

    if fresh <= 0.0 {
        return 1.0;
    }
    (retraced / fresh).min(1.0)
}

pub fn score(meters: f64, target_meters: f64, backtrack: f64, backtrack_weight: f64) -> f64 {
    (meters - target_meters).abs() + backtrack_weight * target_meters * backtrack
}

/// What one batch produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Lowest score among novel routes
    pub best: Option<ScoredRoute>,
    /// Lowest score among novel routes within tolerance
    pub best_within_tolerance: Option<ScoredRoute>,
    pub routed: usize,
    pub skipped_seen: usize,
    pub failed: usize,
}

/// Keep `candidate` in `slot` if it scores lower than what is there.
pub fn keep_lower(slot: &mut Option<ScoredRoute>, candidate: ScoredRoute) {
    match slot {
        Some(current) if current.score <= candidate.score => {}
        _ => *slot = Some(candidate),
    }
}

/// Routes candidate loops and scores them against the target.
#[derive(Clone)]
pub struct RouteEvaluator {
    provider: Arc<dyn RoutingProvider>,
    backtrack_weight: f64,
}

impl RouteEvaluator {
    pub fn new(provider: Arc<dyn RoutingProvider>, backtrack_weight: f64) -> Self {
        RouteEvaluator {
            provider,
            backtrack_weight,
        }
    }

    /// Route start → waypoints → start. `Ok(None)` when there is nothing to
    /// route or the provider found no route.
    pub async fn evaluate(&self, start: Point, candidate: &Candidate) -> Result<Option<RouteResult>> {
        if candidate.waypoints.is_empty() {
            return Ok(None);
        }

        let coordinates = candidate.loop_coordinates(start);
        let Some(routed) = self.provider.route_through(&coordinates).await? else {
            return Ok(None);
        };

        let hash = route_hash(&routed.geometry, routed.meters);
        Ok(Some(RouteResult {
            id: Uuid::new_v4(),
            meters: routed.meters,
            seconds: routed.seconds,
            geometry: routed.geometry,
            legs: routed.legs,
            waypoints: candidate.waypoints.clone(),
            source: candidate.source.clone(),
            hash,
        }))
    }

    pub fn score_route(&self, route: RouteResult, target_meters: f64) -> ScoredRoute {
        let ratio = backtrack_ratio(&route.geometry);
        let diff_meters = (route.meters - target_meters).abs();
        ScoredRoute {
            score: score(route.meters, target_meters, ratio, self.backtrack_weight),
            diff_meters,
            backtrack_ratio: ratio,
            route,
        }
    }

    /// Route every candidate of the batch concurrently. Failures are logged
    /// and dropped; routes already in `seen` are skipped.
    pub async fn evaluate_batch(
        &self,
        start: Point,
        candidates: &[Candidate],
        target_meters: f64,
        tolerance_meters: f64,
        seen: &HashSet<String>,
    ) -> BatchOutcome {
        let results = join_all(candidates.iter().map(|c| self.evaluate(start, c))).await;

        let mut outcome = BatchOutcome::default();
        for (candidate, result) in candidates.iter().zip(results) {
            let route = match result {
                Ok(Some(route)) => route,
                Ok(None) => {
                    tracing::debug!(
                        source = %candidate.source,
                        "No route for candidate {}",
                        candidate.key()
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        source = %candidate.source,
                        error = %e,
                        "Routing failed for candidate: {}",
                        e
                    );
                    outcome.failed += 1;
                    continue;
                }
            };

            outcome.routed += 1;
            if seen.contains(&route.hash) {
                tracing::debug!(hash = %route.hash, "Skipping previously suggested route");
                outcome.skipped_seen += 1;
                continue;
            }

            let scored = self.score_route(route, target_meters);
            tracing::debug!(
                source = %scored.route.source,
                meters = %format!("{:.0}", scored.route.meters),
                diff_m = %format!("{:.0}", scored.diff_meters),
                backtrack = %format!("{:.2}", scored.backtrack_ratio),
                "Candidate routed: {:.0}m (off by {:.0}m), backtrack {:.2}",
                scored.route.meters,
                scored.diff_meters,
                scored.backtrack_ratio
            );

            if scored.diff_meters <= tolerance_meters {
                keep_lower(&mut outcome.best_within_tolerance, scored.clone());
            }
            keep_lower(&mut outcome.best, scored);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CandidateSource, RouteGeometry};
    use async_trait::async_trait;

    #[test]
    fn hash_uses_first_middle_last_and_bucket() {
        let geometry = vec![[10.75, 59.91], [10.76, 59.92], [10.77, 59.93], [10.75, 59.91]];
        let hash = route_hash(&geometry, 3012.0);
        assert_eq!(
            hash,
            "10.7500|59.9100|10.7700|59.9300|10.7500|59.9100|60"
        );
        // a few meters more lands in the same bucket
        assert_eq!(hash, route_hash(&geometry, 3020.0));
        assert_ne!(hash, route_hash(&geometry, 3100.0));
    }

    #[test]
    fn backtrack_of_clean_loop_is_zero() {
        let square = vec![
            [10.750, 59.910],
            [10.760, 59.910],
            [10.760, 59.915],
            [10.750, 59.915],
            [10.750, 59.910],
        ];
        assert_eq!(backtrack_ratio(&square), 0.0);
    }

    #[test]
    fn backtrack_of_out_and_back_is_one() {
        let there_and_back = vec![
            [10.750, 59.910],
            [10.755, 59.912],
            [10.760, 59.914],
            [10.755, 59.912],
            [10.750, 59.910],
        ];
        assert_eq!(backtrack_ratio(&there_and_back), 1.0);
    }

    #[test]
    fn backtrack_of_partial_spur() {
        // square loop with a short spur walked out and back
        let path = vec![
            [10.750, 59.910],
            [10.760, 59.910],
            [10.761, 59.910],
            [10.760, 59.910],
            [10.760, 59.915],
            [10.750, 59.915],
            [10.750, 59.910],
        ];
        let ratio = backtrack_ratio(&path);
        assert!(ratio > 0.0 && ratio < 0.1, "ratio {}", ratio);
    }

    #[test]
    fn backtrack_degenerate_inputs() {
        assert_eq!(backtrack_ratio(&[]), 1.0);
        assert_eq!(backtrack_ratio(&[[10.75, 59.91]]), 1.0);
        assert_eq!(backtrack_ratio(&[[10.75, 59.91], [10.75, 59.91]]), 1.0);
    }

    #[test]
    fn score_combines_diff_and_backtrack() {
        assert_eq!(score(3000.0, 3000.0, 0.0, 0.35), 0.0);
        assert!((score(3100.0, 3000.0, 0.5, 0.35) - (100.0 + 525.0)).abs() < 1e-9);
    }

    struct ByLength;

    #[async_trait]
    impl RoutingProvider for ByLength {
        async fn route_through(&self, coordinates: &[Point]) -> Result<Option<RouteGeometry>> {
            // first waypoint latitude picks the behavior
            let wp = coordinates[1];
            if wp.lat > 60.5 {
                return Err(AppError::RoutingApi("HTTP 502".to_string()));
            }
            if wp.lat > 60.0 {
                return Ok(None);
            }
            let meters = 2500.0 + (wp.lat - 59.0) * 1000.0;
            Ok(Some(RouteGeometry {
                meters,
                seconds: meters / 1.3,
                geometry: vec![
                    [10.75, 59.91],
                    [wp.lng, wp.lat],
                    [10.77, 59.90],
                    [10.75, 59.91],
                ],
                legs: vec![],
            }))
        }
    }

    fn candidate(lat: f64) -> Candidate {
        Candidate::new(
            vec![Point::new(lat, 10.76).unwrap(), Point::new(lat, 10.78).unwrap()],
            CandidateSource::Fallback,
        )
    }

    #[tokio::test]
    async fn evaluate_without_waypoints_is_none() {
        let evaluator = RouteEvaluator::new(Arc::new(ByLength), 0.35);
        let start = Point::new(59.91, 10.75).unwrap();
        let empty = Candidate::new(vec![], CandidateSource::Fallback);
        assert!(evaluator.evaluate(start, &empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_picks_best() {
        let evaluator = RouteEvaluator::new(Arc::new(ByLength), 0.35);
        let start = Point::new(59.91, 10.75).unwrap();
        // 59.5 -> 3000m exactly, 59.8 -> 3300m, 60.2 -> no route, 60.8 -> error
        let batch = vec![candidate(59.8), candidate(59.5), candidate(60.2), candidate(60.8)];

        let outcome = evaluator
            .evaluate_batch(start, &batch, 3000.0, 150.0, &HashSet::new())
            .await;

        assert_eq!(outcome.routed, 2);
        assert_eq!(outcome.failed, 1);
        let best = outcome.best.unwrap();
        assert!((best.route.meters - 3000.0).abs() < 1e-6);
        let within = outcome.best_within_tolerance.unwrap();
        assert_eq!(within.route.hash, best.route.hash);
    }

    #[tokio::test]
    async fn batch_skips_seen_hashes() {
        let evaluator = RouteEvaluator::new(Arc::new(ByLength), 0.35);
        let start = Point::new(59.91, 10.75).unwrap();
        let batch = vec![candidate(59.5), candidate(59.8)];

        let first = evaluator
            .evaluate_batch(start, &batch, 3000.0, 150.0, &HashSet::new())
            .await;
        let seen: HashSet<String> = [first.best.unwrap().route.hash].into_iter().collect();

        let second = evaluator
            .evaluate_batch(start, &batch, 3000.0, 150.0, &seen)
            .await;
        assert_eq!(second.skipped_seen, 1);
        let best = second.best.unwrap();
        assert!((best.route.meters - 3300.0).abs() < 1e-6);
        // 300 m off is outside a 150 m tolerance
        assert!(second.best_within_tolerance.is_none());
    }

    #[test]
    fn keep_lower_prefers_lower_score() {
        let route = |score: f64| ScoredRoute {
            route: RouteResult {
                id: Uuid::new_v4(),
                meters: 0.0,
                seconds: 0.0,
                geometry: vec![],
                legs: vec![],
                waypoints: vec![],
                source: CandidateSource::Fallback,
                hash: score.to_string(),
            },
            score,
            diff_meters: 0.0,
            backtrack_ratio: 0.0,
        };
        let mut slot = None;
        keep_lower(&mut slot, route(5.0));
        keep_lower(&mut slot, route(9.0));
        keep_lower(&mut slot, route(2.0));
        assert_eq!(slot.map(|s| s.score), Some(2.0));
    }
}
