use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkloop::config::Config;
use walkloop::constants::{OSLO_REFERENCE_LAT, OSLO_REFERENCE_LNG};
use walkloop::models::steps::format_duration;
use walkloop::{Point, WalkPlanner};

const DEFAULT_STEPS: u32 = 6_000;
const HISTORY_LINES: usize = 10;

fn print_help() {
    eprintln!(
        "\
Usage: walkloop [OPTIONS]

Suggest a closed walking loop for a step goal.

Options:
  --lat=LAT       Start latitude (default: central Oslo)
  --lng=LNG       Start longitude (default: central Oslo)
  --steps=N       Step goal, at least 500 (default: 6000)
  --json          Print the full outcome as JSON
  --history       Show the last 10 suggestions
  --clear         Forget suggestion history and seen routes
  --help          Show this help message

Environment:
  OSRM_BASE_URL, OSRM_PROFILE, OVERPASS_ENDPOINTS, WALKLOOP_STORE_DIR,
  SEARCH_* tuning variables, RUST_LOG"
    );
}

fn parse_arg<T: std::str::FromStr>(args: &[String], prefix: &str) -> Result<Option<T>, String> {
    match args.iter().find_map(|a| a.strip_prefix(prefix)) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid value for {}{}", prefix, raw)),
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walkloop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help") {
        print_help();
        return Ok(());
    }

    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;
    let planner = WalkPlanner::from_config(&config)?;

    if args.iter().any(|a| a == "--clear") {
        planner.clear_history().await?;
        println!("History cleared.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--history") {
        let history = planner.history(HISTORY_LINES).await?;
        if history.is_empty() {
            println!("No suggestions yet.");
        }
        for entry in history {
            println!(
                "{}  {:>6} steps  {:.2} km",
                entry.timestamp.date(),
                entry.steps,
                entry.distance_km
            );
        }
        return Ok(());
    }

    let lat = parse_arg(&args, "--lat=")?.unwrap_or(OSLO_REFERENCE_LAT);
    let lng = parse_arg(&args, "--lng=")?.unwrap_or(OSLO_REFERENCE_LNG);
    let steps = parse_arg(&args, "--steps=")?.unwrap_or(DEFAULT_STEPS);
    let json_output = args.iter().any(|a| a == "--json");

    let start = Point::new(lat, lng)?;
    let suggestion = planner.suggest_for_steps(start, steps).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
        return Ok(());
    }

    println!("{}", suggestion.summary());
    if let Some(scored) = suggestion.route() {
        let route = &scored.route;
        println!(
            "  {} via {} waypoints, {}",
            route.source,
            route.waypoints.len(),
            format_duration(route.seconds)
        );
        for leg in &route.legs {
            for step in leg.steps.iter().filter(|s| !s.name.is_empty()) {
                println!("  {:>6.0} m  {}", step.distance, step.name);
            }
        }
    }

    Ok(())
}
