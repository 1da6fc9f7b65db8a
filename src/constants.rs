//! Stable crate-wide constants.
//!
//! Values here are structural invariants, algorithm coefficients, and default
//! fallbacks for env-var-based configuration. Tuning knobs that are worth
//! experimenting with at runtime live in
//! [`SearchConfig`](crate::config::SearchConfig) instead.

// --- Geodesy ---

/// Mean Earth radius used by every spherical formula in the crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// --- Steps model ---

/// Average stride length used to convert between steps and meters.
pub const METERS_PER_STEP: f64 = 0.75;
/// Smallest step goal accepted by the planner.
pub const MIN_STEPS: u32 = 500;

// --- Collaborator defaults (used when env vars are absent) ---

/// Public OSRM demo server.
pub const DEFAULT_OSRM_BASE_URL: &str = "https://router.project-osrm.org";
/// OSRM pedestrian profile name.
pub const DEFAULT_OSRM_PROFILE: &str = "foot";
/// Overpass endpoints, tried in order.
pub const DEFAULT_OVERPASS_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];
/// Hard per-endpoint timeout for Overpass requests (the request is cancelled).
pub const DEFAULT_OVERPASS_TIMEOUT_MS: u64 = 3_000;
/// Timeout for a single routing request.
pub const DEFAULT_ROUTING_TIMEOUT_MS: u64 = 10_000;
/// Directory used by the file-backed store when `WALKLOOP_STORE_DIR` is unset.
pub const DEFAULT_STORE_DIR: &str = ".walkloop";

// --- Persisted state ---

/// Storage key for the suggestion history list.
pub const HISTORY_KEY: &str = "onsketur_history_v1";
/// Storage key for the set of already suggested route hashes.
pub const SEEN_KEY: &str = "onsketur_seen_v1";
/// Maximum number of history entries kept.
pub const HISTORY_CAPACITY: usize = 100;

// --- Walkable-network sampling ---

/// Sampling radius as a fraction of the target route length.
pub const SAMPLER_RADIUS_FACTOR: f64 = 0.55;
/// Lower bound on the sampling radius.
pub const SAMPLER_MIN_RADIUS_M: f64 = 800.0;
/// Upper bound on the sampling radius.
pub const SAMPLER_MAX_RADIUS_M: f64 = 4_500.0;
/// Granularity of the radius component of the cache fingerprint.
pub const SAMPLER_RADIUS_BUCKET_M: f64 = 100.0;
/// Maximum number of ways returned by one Overpass query.
pub const SAMPLER_MAX_WAYS: usize = 200;
/// Highway values considered walkable.
pub const WALKABLE_HIGHWAYS: &[&str] = &[
    "footway",
    "path",
    "pedestrian",
    "living_street",
    "residential",
    "track",
    "service",
    "unclassified",
    "tertiary",
];

// --- Candidate generation ---

/// Shortest allowed distance from the start to a network waypoint, and
/// between two consecutive waypoints.
pub const MIN_LEG_METERS: f64 = 120.0;
/// Floor of the farthest allowed network waypoint distance.
pub const MAX_LEG_FLOOR_METERS: f64 = 500.0;
/// Farthest allowed network waypoint distance as a fraction of the target.
pub const MAX_LEG_TARGET_FACTOR: f64 = 0.78;
/// Usable sample points required before the network strategy runs.
pub const MIN_USABLE_POINTS: usize = 6;
/// Smallest circular gap between waypoint bearings (3 or more waypoints).
pub const MIN_ANGULAR_GAP_DEG: f64 = 25.0;
/// Allowed bearing separation range for two-waypoint loops.
pub const TWO_WAYPOINT_MIN_SEPARATION_DEG: f64 = 45.0;
pub const TWO_WAYPOINT_MAX_SEPARATION_DEG: f64 = 170.0;
/// Score penalty (meters) per degree a bearing gap deviates from even spacing.
pub const SPACING_PENALTY_M_PER_DEG: f64 = 4.0;
/// Striding attempts per wanted candidate in the network strategy.
pub const NETWORK_ATTEMPTS_PER_CANDIDATE: usize = 6;

/// Smallest fallback radius.
pub const FALLBACK_MIN_RADIUS_M: f64 = 250.0;
/// Ratio between street distance and the straight-line polygon perimeter.
pub const FALLBACK_DETOUR_FACTOR: f64 = 1.25;
/// Base bearing rotation per search round.
pub const FALLBACK_ROUND_ROTATION_DEG: f64 = 31.0;
/// Base bearing rotation per candidate index.
pub const FALLBACK_CANDIDATE_ROTATION_DEG: f64 = 23.0;
/// Spacing jitter step, applied `(i % 5) - 2` times around the even spacing.
pub const FALLBACK_SPACING_JITTER_DEG: f64 = 6.0;
/// Radius shrink step, applied `(i % 3)` times.
pub const FALLBACK_RADIUS_JITTER: f64 = 0.07;

/// Decimal places of the candidate dedup key.
pub const CANDIDATE_KEY_PRECISION: usize = 4;

// --- Route evaluation ---

/// Decimal places of the route hash coordinates.
pub const ROUTE_HASH_PRECISION: usize = 4;
/// Bucket width of the route hash distance component.
pub const ROUTE_HASH_DISTANCE_BUCKET_M: f64 = 50.0;
/// Decimal places used for segment identity in the backtrack ratio.
pub const BACKTRACK_SEGMENT_PRECISION: i32 = 5;

// --- Regional fallback ---

/// Radius around a reference location within which its template loops apply.
pub const REGIONAL_RADIUS_M: f64 = 6_500.0;
/// Center of the built-in Oslo reference region.
pub const OSLO_REFERENCE_LAT: f64 = 59.9139;
pub const OSLO_REFERENCE_LNG: f64 = 10.7522;
