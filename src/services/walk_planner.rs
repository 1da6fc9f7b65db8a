use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::steps::{format_duration, meters_to_steps, steps_to_meters, validate_steps};
use crate::models::{HistoryEntry, Point, ScoredRoute};
use crate::services::osrm::OsrmClient;
use crate::services::overpass::OverpassClient;
use crate::services::route_search::{RegionalTemplates, RouteSearch, SearchOutcome};
use crate::storage::{FileStore, SuggestionStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Result of one suggestion request.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub target_meters: f64,
    pub outcome: SearchOutcome,
}

impl Suggestion {
    pub fn route(&self) -> Option<&ScoredRoute> {
        self.outcome.route()
    }

    /// One-line description for the walker.
    pub fn summary(&self) -> String {
        match &self.outcome {
            SearchOutcome::Accepted { route, .. } => {
                format!("Found a {}.", self.describe(route))
            }
            SearchOutcome::BestEffort { route, .. } => format!(
                "No loop matched your goal closely; the closest is a {}.",
                self.describe(route)
            ),
            SearchOutcome::NoRoute { .. } => {
                "Could not find a walking loop from here. Try another start point or step goal."
                    .to_string()
            }
        }
    }

    fn describe(&self, scored: &ScoredRoute) -> String {
        let route = &scored.route;
        let deviation =
            route.estimated_steps() as i64 - meters_to_steps(self.target_meters) as i64;
        let relation = match deviation {
            0 => "right on your goal".to_string(),
            d if d > 0 => format!("{} steps over your goal", d),
            d => format!("{} steps under your goal", -d),
        };
        format!(
            "{:.2} km loop (about {} steps, {}), {}",
            route.distance_km(),
            route.estimated_steps(),
            format_duration(route.seconds),
            relation
        )
    }
}

/// Entry point: validates requests, threads the seen set through the search
/// and persists accepted loops.
pub struct WalkPlanner {
    search: RouteSearch,
    store: SuggestionStore,
}

impl WalkPlanner {
    pub fn new(search: RouteSearch, store: SuggestionStore) -> Self {
        WalkPlanner { search, store }
    }

    /// Live collaborators and a file-backed store, as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.search.validate().map_err(AppError::Config)?;

        let routing = OsrmClient::with_config(
            config.osrm_base_url.clone(),
            config.osrm_profile.clone(),
            Duration::from_millis(config.routing_timeout_ms),
        );
        let walkable = OverpassClient::with_endpoints(
            config.overpass_endpoints.clone(),
            Duration::from_millis(config.overpass_timeout_ms),
        );
        let search = RouteSearch::new(
            Arc::new(routing),
            Arc::new(walkable),
            RegionalTemplates::builtin(),
            config.search.clone(),
        );
        let store = SuggestionStore::new(Arc::new(FileStore::new(&config.store_dir)));

        Ok(Self::new(search, store))
    }

    pub async fn suggest_for_steps(&self, start: Point, steps: u32) -> Result<Suggestion> {
        validate_steps(steps).map_err(AppError::InvalidRequest)?;
        self.suggest_route(start, steps_to_meters(steps)).await
    }

    pub async fn suggest_route(&self, start: Point, target_meters: f64) -> Result<Suggestion> {
        if !target_meters.is_finite() || target_meters <= 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "target distance must be positive, got {}",
                target_meters
            )));
        }
        Point::new(start.lat, start.lng).map_err(AppError::InvalidRequest)?;

        tracing::info!(
            start = %start,
            target_m = %format!("{:.0}", target_meters),
            "Suggesting a {:.0}m loop from {}",
            target_meters,
            start
        );

        let seen = self.store.seen_hashes().await?;
        let outcome = self.search.find(start, target_meters, &seen).await;

        // only accepted loops become history; a best effort may be offered again
        if let SearchOutcome::Accepted { route, .. } = &outcome {
            self.store
                .record(&route.route, OffsetDateTime::now_utc())
                .await?;
        }

        let stats = outcome.stats();
        tracing::info!(
            accepted = outcome.is_accepted(),
            rounds = stats.rounds_run,
            candidates = stats.candidates_evaluated,
            "Search finished after {} rounds, {} candidates",
            stats.rounds_run,
            stats.candidates_evaluated
        );

        Ok(Suggestion {
            target_meters,
            outcome,
        })
    }

    /// The latest `limit` history entries, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut history = self.store.history().await?;
        history.truncate(limit);
        Ok(history)
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.store.clear().await
    }
}
