//! Closed-loop route search: sample the walkable network, generate waypoint
//! candidates, route them in batches and accept the first loop close enough
//! to the target, loosening the tolerance round by round.

pub mod candidates;
pub mod evaluator;
pub mod fallback_loop;
pub mod geodesy;
pub mod network_waypoints;
pub mod regional;

pub use candidates::{dedup_candidates, CandidateGenerator};
pub use evaluator::{backtrack_ratio, route_hash, BatchOutcome, RouteEvaluator};
pub use regional::{ReferenceRegion, RegionalTemplates, TemplateLoop};

use crate::config::SearchConfig;
use crate::models::{Candidate, Point, ScoredRoute};
use crate::services::osrm::RoutingProvider;
use crate::services::overpass::WalkableSource;
use crate::services::walkable_sampler::WalkableSampler;
use evaluator::keep_lower;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Which stage produced an accepted route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchStage {
    /// One of the tolerance rounds, 1-based
    Round { round: usize, tolerance_m: f64 },
    /// A template loop of a reference region
    Regional { region: String, tolerance_m: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub rounds_run: usize,
    pub candidates_evaluated: usize,
    pub routes_found: usize,
    pub skipped_seen: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Accepted {
        route: ScoredRoute,
        stage: SearchStage,
        stats: SearchStats,
    },
    /// Nothing met a tolerance; the lowest-score route seen anywhere
    BestEffort {
        route: ScoredRoute,
        stats: SearchStats,
    },
    NoRoute {
        stats: SearchStats,
    },
}

impl SearchOutcome {
    pub fn route(&self) -> Option<&ScoredRoute> {
        match self {
            SearchOutcome::Accepted { route, .. } | SearchOutcome::BestEffort { route, .. } => {
                Some(route)
            }
            SearchOutcome::NoRoute { .. } => None,
        }
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            SearchOutcome::Accepted { stats, .. }
            | SearchOutcome::BestEffort { stats, .. }
            | SearchOutcome::NoRoute { stats } => stats,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SearchOutcome::Accepted { .. })
    }
}

/// Search state carried across rounds of one request.
struct SearchRun<'a> {
    start: Point,
    target_meters: f64,
    seen: &'a HashSet<String>,
    best_overall: Option<ScoredRoute>,
    stats: SearchStats,
}

impl SearchRun<'_> {
    fn absorb(&mut self, batch_len: usize, outcome: &BatchOutcome) {
        self.stats.candidates_evaluated += batch_len;
        self.stats.routes_found += outcome.routed;
        self.stats.skipped_seen += outcome.skipped_seen;
        if let Some(best) = &outcome.best {
            keep_lower(&mut self.best_overall, best.clone());
        }
    }
}

pub struct RouteSearch {
    sampler: WalkableSampler,
    evaluator: RouteEvaluator,
    generator: CandidateGenerator,
    regions: RegionalTemplates,
    config: SearchConfig,
}

impl RouteSearch {
    pub fn new(
        routing: Arc<dyn RoutingProvider>,
        walkable: Arc<dyn WalkableSource>,
        regions: RegionalTemplates,
        config: SearchConfig,
    ) -> Self {
        RouteSearch {
            sampler: WalkableSampler::new(
                walkable,
                Duration::from_millis(config.sampler_soft_timeout_ms),
            ),
            evaluator: RouteEvaluator::new(routing, config.backtrack_weight),
            generator: CandidateGenerator::new(config.max_candidates, config.seed),
            regions,
            config,
        }
    }

    /// Find a loop from `start` close to `target_meters` that is not in
    /// `seen`. Never fails: collaborator trouble degrades to `NoRoute`.
    pub async fn find(
        &self,
        start: Point,
        target_meters: f64,
        seen: &HashSet<String>,
    ) -> SearchOutcome {
        let mut run = SearchRun {
            start,
            target_meters,
            seen,
            best_overall: None,
            stats: SearchStats::default(),
        };

        for round in 0..self.config.rounds() {
            if let Some(outcome) = self.run_round(&mut run, round).await {
                return outcome;
            }
        }

        if self.config.regional_fallback_enabled {
            if let Some(outcome) = self.run_regional(&mut run).await {
                return outcome;
            }
        }

        match run.best_overall {
            Some(route) => {
                tracing::warn!(
                    meters = %format!("{:.0}", route.route.meters),
                    diff_m = %format!("{:.0}", route.diff_meters),
                    "No route within tolerance, using best effort ({:.0}m, off by {:.0}m)",
                    route.route.meters,
                    route.diff_meters
                );
                SearchOutcome::BestEffort {
                    route,
                    stats: run.stats,
                }
            }
            None => {
                tracing::warn!(
                    candidates = run.stats.candidates_evaluated,
                    "No route found after {} candidates",
                    run.stats.candidates_evaluated
                );
                SearchOutcome::NoRoute { stats: run.stats }
            }
        }
    }

    async fn run_round(&self, run: &mut SearchRun<'_>, round: usize) -> Option<SearchOutcome> {
        let stage = self.config.stage(round);
        let tolerance_m = stage.tolerance_meters(run.target_meters);
        run.stats.rounds_run = round + 1;

        let walkable = self
            .sampler
            .sample(run.start, run.target_meters, stage.radius_scale)
            .await;
        let pool = self.generator.generate(
            run.start,
            run.target_meters,
            &walkable,
            round,
            stage.waypoint_count,
        );

        tracing::info!(
            round = round + 1,
            tolerance_m = %format!("{:.0}", tolerance_m),
            waypoints = stage.waypoint_count,
            walkable_points = walkable.len(),
            candidates = pool.len(),
            "Round {}: {} candidates, tolerance ±{:.0}m",
            round + 1,
            pool.len(),
            tolerance_m
        );

        let stage_tag = SearchStage::Round {
            round: round + 1,
            tolerance_m,
        };
        self.evaluate_pool(run, &pool, tolerance_m, stage_tag).await
    }

    async fn run_regional(&self, run: &mut SearchRun<'_>) -> Option<SearchOutcome> {
        let region = self.regions.region_for(run.start)?;
        let tolerance_m = run.target_meters * self.config.regional_tolerance_pct;
        let pool = region.candidates_for(run.target_meters, self.config.batch_size);

        tracing::info!(
            region = %region.name,
            candidates = pool.len(),
            "Trying {} template loops of region {}",
            pool.len(),
            region.name
        );

        let stage_tag = SearchStage::Regional {
            region: region.name.clone(),
            tolerance_m,
        };
        self.evaluate_pool(run, &pool, tolerance_m, stage_tag).await
    }

    /// Evaluate `pool` batch by batch, stopping at the first acceptance.
    async fn evaluate_pool(
        &self,
        run: &mut SearchRun<'_>,
        pool: &[Candidate],
        tolerance_m: f64,
        stage: SearchStage,
    ) -> Option<SearchOutcome> {
        for batch in pool.chunks(self.config.batch_size.max(1)) {
            let outcome = self
                .evaluator
                .evaluate_batch(run.start, batch, run.target_meters, tolerance_m, run.seen)
                .await;
            run.absorb(batch.len(), &outcome);

            if let Some(route) = outcome.best_within_tolerance {
                tracing::info!(
                    source = %route.route.source,
                    meters = %format!("{:.0}", route.route.meters),
                    diff_m = %format!("{:.0}", route.diff_meters),
                    "Accepted {} route: {:.0}m (off by {:.0}m)",
                    route.route.source,
                    route.route.meters,
                    route.diff_meters
                );
                return Some(SearchOutcome::Accepted {
                    route,
                    stage,
                    stats: run.stats.clone(),
                });
            }
        }
        None
    }
}
