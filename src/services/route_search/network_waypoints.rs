use super::geodesy::{bearing_degrees, haversine_meters, normalize_bearing_delta};
use crate::constants::*;
use crate::models::{Candidate, CandidateSource, Point};

/// A sampled point with its polar position relative to the start.
#[derive(Debug, Clone, Copy)]
struct UsablePoint {
    point: Point,
    distance: f64,
    bearing: f64,
}

/// Farthest distance from the start a network waypoint may lie.
pub fn max_leg_meters(target_meters: f64) -> f64 {
    (target_meters * MAX_LEG_TARGET_FACTOR).max(MAX_LEG_FLOOR_METERS)
}

/// Build candidate loops out of sampled walkable points.
///
/// Picks are made by striding over the points sorted by bearing, so each
/// candidate fans out around the start. The stride shifts with `round` and the
/// attempt index; the search is bounded and does not enumerate combinations.
pub fn network_candidates(
    start: Point,
    target_meters: f64,
    points: &[Point],
    round: usize,
    waypoint_count: usize,
    max_candidates: usize,
) -> Vec<Candidate> {
    let max_leg = max_leg_meters(target_meters);
    let mut usable: Vec<UsablePoint> = points
        .iter()
        .map(|&point| UsablePoint {
            point,
            distance: haversine_meters(start, point),
            bearing: bearing_degrees(start, point),
        })
        .filter(|p| (MIN_LEG_METERS..=max_leg).contains(&p.distance))
        .collect();

    if usable.len() < MIN_USABLE_POINTS || waypoint_count == 0 {
        tracing::debug!(
            usable = usable.len(),
            sampled = points.len(),
            "Only {} of {} sampled points usable, skipping network candidates",
            usable.len(),
            points.len()
        );
        return Vec::new();
    }

    usable.sort_by(|a, b| a.bearing.total_cmp(&b.bearing));

    let n = usable.len();
    // leave one stride of slack for the leg back to the start
    let stride = (n / (waypoint_count + 1)).max(1);
    let wobble_span = (stride / 2).max(1);
    let ideal_leg = target_meters / (waypoint_count as f64 + 1.0);
    let attempts = max_candidates * NETWORK_ATTEMPTS_PER_CANDIDATE;

    let mut scored: Vec<(f64, Candidate)> = Vec::new();
    let mut rejected = 0usize;

    for attempt in 0..attempts {
        let base = (attempt * 7 + round * 13) % n;
        let picks: Vec<UsablePoint> = (0..waypoint_count)
            .map(|k| {
                let wobble = ((attempt + round) * (2 * k + 1) * 3) % wobble_span;
                usable[(base + k * stride + wobble) % n]
            })
            .collect();

        match score_picks(&picks, ideal_leg) {
            Some((score, ordered)) => scored.push((
                score,
                Candidate::new(
                    ordered.iter().map(|p| p.point).collect(),
                    CandidateSource::Network,
                ),
            )),
            None => rejected += 1,
        }
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut seen_keys = std::collections::HashSet::new();
    let candidates: Vec<Candidate> = scored
        .into_iter()
        .map(|(_, candidate)| candidate)
        .filter(|candidate| seen_keys.insert(candidate.key()))
        .take(max_candidates)
        .collect();

    tracing::debug!(
        usable = n,
        attempts = attempts,
        rejected = rejected,
        kept = candidates.len(),
        "Network candidates: {} kept from {} attempts over {} usable points ({} rejected)",
        candidates.len(),
        attempts,
        n,
        rejected
    );

    candidates
}

/// Validate a pick and return its score (lower is better) with the
/// waypoints in visiting order, or `None` when the shape is unusable.
fn score_picks(picks: &[UsablePoint], ideal_leg: f64) -> Option<(f64, Vec<UsablePoint>)> {
    let ordered = order_for_loop(picks);

    // duplicate points within a set
    for (i, a) in ordered.iter().enumerate() {
        if ordered[i + 1..]
            .iter()
            .any(|b| a.point.key(CANDIDATE_KEY_PRECISION) == b.point.key(CANDIDATE_KEY_PRECISION))
        {
            return None;
        }
    }

    // consecutive waypoints too close together
    if ordered
        .windows(2)
        .any(|w| haversine_meters(w[0].point, w[1].point) < MIN_LEG_METERS)
    {
        return None;
    }

    let gaps = arc_gaps(&ordered);
    if ordered.len() == 2 {
        let separation = gaps[0];
        if !(TWO_WAYPOINT_MIN_SEPARATION_DEG..=TWO_WAYPOINT_MAX_SEPARATION_DEG)
            .contains(&separation)
        {
            return None;
        }
    } else if min_circular_gap(&ordered) < MIN_ANGULAR_GAP_DEG {
        return None;
    }

    let ideal_gap = 360.0 / (ordered.len() as f64 + 1.0);
    let distance_penalty: f64 = ordered
        .iter()
        .map(|p| (p.distance - ideal_leg).abs())
        .sum();
    let spacing_penalty: f64 = gaps
        .iter()
        .map(|gap| (gap - ideal_gap).abs() * SPACING_PENALTY_M_PER_DEG)
        .sum();

    Some((distance_penalty + spacing_penalty, ordered))
}

/// Sort by bearing and rotate so the walk starts right after the widest
/// empty sector: the loop then sweeps one arc without crossing itself.
fn order_for_loop(picks: &[UsablePoint]) -> Vec<UsablePoint> {
    let mut ordered = picks.to_vec();
    ordered.sort_by(|a, b| a.bearing.total_cmp(&b.bearing));
    if ordered.len() < 2 {
        return ordered;
    }

    let n = ordered.len();
    let widest_after = (0..n)
        .max_by(|&i, &j| {
            circular_gap(&ordered[i], &ordered[(i + 1) % n])
                .total_cmp(&circular_gap(&ordered[j], &ordered[(j + 1) % n]))
        })
        .unwrap_or(n - 1);
    ordered.rotate_left((widest_after + 1) % n);
    ordered
}

fn circular_gap(from: &UsablePoint, to: &UsablePoint) -> f64 {
    (to.bearing - from.bearing).rem_euclid(360.0)
}

/// Bearing gaps between consecutive waypoints in visiting order.
fn arc_gaps(ordered: &[UsablePoint]) -> Vec<f64> {
    ordered
        .windows(2)
        .map(|w| normalize_bearing_delta(w[1].bearing - w[0].bearing))
        .collect()
}

fn min_circular_gap(ordered: &[UsablePoint]) -> f64 {
    let n = ordered.len();
    (0..n)
        .map(|i| circular_gap(&ordered[i], &ordered[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}
