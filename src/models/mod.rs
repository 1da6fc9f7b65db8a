pub mod history;
pub mod point;
pub mod route;
pub mod steps;

pub use history::HistoryEntry;
pub use point::Point;
pub use route::{
    Candidate, CandidateSource, Maneuver, RouteGeometry, RouteLeg, RouteResult, RouteStep,
    ScoredRoute,
};
