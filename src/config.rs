use crate::constants::*;
use std::env;
use std::str::FromStr;

/// One search round's acceptance band and sampling shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceStage {
    /// Accepted deviation as a fraction of the target (0.05 = ±5%)
    pub tolerance_pct: f64,
    /// Minimum accepted deviation in meters, for short targets
    pub tolerance_floor_m: f64,
    /// Multiplier on the walkable-network sampling radius
    pub radius_scale: f64,
    /// Number of intermediate waypoints per candidate
    pub waypoint_count: usize,
}

impl ToleranceStage {
    pub fn tolerance_meters(&self, target_meters: f64) -> f64 {
        (target_meters * self.tolerance_pct).max(self.tolerance_floor_m)
    }
}

pub fn default_stages() -> Vec<ToleranceStage> {
    vec![
        ToleranceStage {
            tolerance_pct: 0.05,
            tolerance_floor_m: 75.0,
            radius_scale: 1.0,
            waypoint_count: 2,
        },
        ToleranceStage {
            tolerance_pct: 0.10,
            tolerance_floor_m: 150.0,
            radius_scale: 1.25,
            waypoint_count: 3,
        },
        ToleranceStage {
            tolerance_pct: 0.15,
            tolerance_floor_m: 250.0,
            radius_scale: 1.5,
            waypoint_count: 4,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Rounds to run, capped at the number of stages
    pub max_search_rounds: usize,

    /// Per-round tolerance and sampling stages, loosest last
    pub stages: Vec<ToleranceStage>,

    /// Candidates evaluated concurrently per batch
    pub batch_size: usize,

    /// Cap on the deduplicated candidate pool per round
    pub max_candidates: usize,

    /// Soft limit on waiting for walkable points before generating without them
    pub sampler_soft_timeout_ms: u64,

    /// Weight of the backtrack penalty, as a fraction of the target distance
    pub backtrack_weight: f64,

    /// Tolerance used for regional template loops
    pub regional_tolerance_pct: f64,

    /// Whether regional template loops are tried after all rounds fail
    pub regional_fallback_enabled: bool,

    /// Fixed seed for the fallback base bearing; random when unset
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_search_rounds: 3,
            stages: default_stages(),
            batch_size: 6,
            max_candidates: 18,
            sampler_soft_timeout_ms: 3_500,
            backtrack_weight: 0.35,
            regional_tolerance_pct: 0.15,
            regional_fallback_enabled: true,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            max_search_rounds: env_or("SEARCH_MAX_ROUNDS", defaults.max_search_rounds)?,
            stages: defaults.stages,
            batch_size: env_or("SEARCH_BATCH_SIZE", defaults.batch_size)?,
            max_candidates: env_or("SEARCH_MAX_CANDIDATES", defaults.max_candidates)?,
            sampler_soft_timeout_ms: env_or(
                "SEARCH_SAMPLER_SOFT_TIMEOUT_MS",
                defaults.sampler_soft_timeout_ms,
            )?,
            backtrack_weight: env_or("SEARCH_BACKTRACK_WEIGHT", defaults.backtrack_weight)?,
            regional_tolerance_pct: env_or(
                "SEARCH_REGIONAL_TOLERANCE_PCT",
                defaults.regional_tolerance_pct,
            )?,
            regional_fallback_enabled: env_or(
                "SEARCH_REGIONAL_FALLBACK",
                defaults.regional_fallback_enabled,
            )?,
            seed: match env::var("SEARCH_SEED") {
                Ok(value) => Some(value.parse().map_err(|_| "Invalid SEARCH_SEED")?),
                Err(_) => None,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.stages.is_empty() {
            return Err("At least one tolerance stage is required".to_string());
        }
        if self.batch_size == 0 {
            return Err("SEARCH_BATCH_SIZE must be at least 1".to_string());
        }
        if self.max_candidates == 0 {
            return Err("SEARCH_MAX_CANDIDATES must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.regional_tolerance_pct) {
            return Err("SEARCH_REGIONAL_TOLERANCE_PCT must be between 0 and 1".to_string());
        }
        if self
            .stages
            .iter()
            .any(|s| !(2..=4).contains(&s.waypoint_count))
        {
            return Err("Stages must use between 2 and 4 waypoints".to_string());
        }
        Ok(())
    }

    /// Number of rounds actually run.
    pub fn rounds(&self) -> usize {
        self.max_search_rounds.min(self.stages.len())
    }

    /// Stage for a round, reusing the loosest stage past the end.
    pub fn stage(&self, round: usize) -> ToleranceStage {
        let idx = round.min(self.stages.len().saturating_sub(1));
        self.stages[idx]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub osrm_base_url: String,
    pub osrm_profile: String,
    pub routing_timeout_ms: u64,
    pub overpass_endpoints: Vec<String>,
    pub overpass_timeout_ms: u64,
    pub store_dir: String,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            osrm_base_url: DEFAULT_OSRM_BASE_URL.to_string(),
            osrm_profile: DEFAULT_OSRM_PROFILE.to_string(),
            routing_timeout_ms: DEFAULT_ROUTING_TIMEOUT_MS,
            overpass_endpoints: DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overpass_timeout_ms: DEFAULT_OVERPASS_TIMEOUT_MS,
            store_dir: DEFAULT_STORE_DIR.to_string(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        let overpass_endpoints: Vec<String> = match env::var("OVERPASS_ENDPOINTS") {
            Ok(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.overpass_endpoints,
        };

        if overpass_endpoints.is_empty() {
            return Err("OVERPASS_ENDPOINTS must list at least one endpoint".to_string());
        }

        Ok(Config {
            osrm_base_url: env::var("OSRM_BASE_URL").unwrap_or(defaults.osrm_base_url),
            osrm_profile: env::var("OSRM_PROFILE").unwrap_or(defaults.osrm_profile),
            routing_timeout_ms: env_or("ROUTING_TIMEOUT_MS", defaults.routing_timeout_ms)?,
            overpass_endpoints,
            overpass_timeout_ms: env_or("OVERPASS_TIMEOUT_MS", defaults.overpass_timeout_ms)?,
            store_dir: env::var("WALKLOOP_STORE_DIR").unwrap_or(defaults.store_dir),
            search: SearchConfig::from_env()?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr + ToString,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| format!("Invalid {}", key))
}
