pub mod osrm;
pub mod overpass;
pub mod route_search;
pub mod walk_planner;
pub mod walkable_sampler;
