// Library exports for the CLI and integration tests

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Point, RouteResult, ScoredRoute};
pub use services::route_search::{RouteSearch, SearchOutcome, SearchStage, SearchStats};
pub use services::walk_planner::{Suggestion, WalkPlanner};
