use serial_test::serial;
use std::path::PathBuf;
use std::sync::Arc;
use walkloop::config::Config;
use walkloop::constants::{HISTORY_KEY, SEEN_KEY};
use walkloop::services::route_search::{RegionalTemplates, RouteSearch};
use walkloop::storage::{FileStore, KeyValueStore, SuggestionStore};
use walkloop::WalkPlanner;

mod common;
use common::*;

fn temp_store_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("walkloop-{}-{}", name, uuid::Uuid::new_v4()))
}

fn file_planner(dir: &PathBuf) -> WalkPlanner {
    let search = RouteSearch::new(
        ScriptedRouter::fixed_length(3000.0),
        FakeWalkable::empty(),
        RegionalTemplates::empty(),
        test_search_config(),
    );
    WalkPlanner::new(search, SuggestionStore::new(Arc::new(FileStore::new(dir))))
}

#[tokio::test]
async fn history_and_seen_set_survive_restarts() {
    let dir = temp_store_dir("restart");

    let first = file_planner(&dir)
        .suggest_route(stockholm(), 3000.0)
        .await
        .unwrap();

    // a fresh planner over the same directory knows the earlier suggestion
    let planner = file_planner(&dir);
    let second = planner.suggest_route(stockholm(), 3000.0).await.unwrap();
    assert_ne!(
        first.route().unwrap().route.hash,
        second.route().unwrap().route.hash
    );

    let history = planner.history(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].steps, 4000);

    let raw = FileStore::new(&dir).get(SEEN_KEY).await.unwrap().unwrap();
    let seen: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(seen.len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn history_file_uses_camel_case_and_rfc3339() {
    let dir = temp_store_dir("format");
    file_planner(&dir)
        .suggest_route(stockholm(), 3000.0)
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.join(format!("{}.json", HISTORY_KEY))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &value[0];
    assert_eq!(entry["steps"], 4000);
    assert_eq!(entry["distanceKm"], 3.0);
    let timestamp = entry["timestamp"].as_str().unwrap();
    assert!(time::OffsetDateTime::parse(
        timestamp,
        &time::format_description::well_known::Rfc3339
    )
    .is_ok());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn clear_history_allows_routes_again() {
    let dir = temp_store_dir("clear");
    let planner = file_planner(&dir);

    let first = planner.suggest_route(stockholm(), 3000.0).await.unwrap();
    planner.clear_history().await.unwrap();
    assert!(planner.history(10).await.unwrap().is_empty());

    // with the seen set gone the same loop may be suggested again
    let again = planner.suggest_route(stockholm(), 3000.0).await.unwrap();
    assert_eq!(
        first.route().unwrap().route.hash,
        again.route().unwrap().route.hash
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn corrupt_files_are_treated_as_empty() {
    let dir = temp_store_dir("corrupt");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.json", SEEN_KEY)), "[[[").unwrap();
    std::fs::write(dir.join(format!("{}.json", HISTORY_KEY)), "").unwrap();

    let planner = file_planner(&dir);
    assert!(planner.history(10).await.unwrap().is_empty());
    let suggestion = planner.suggest_route(stockholm(), 3000.0).await.unwrap();
    assert!(suggestion.outcome.is_accepted());
    assert_eq!(planner.history(10).await.unwrap().len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
#[serial]
fn planner_builds_from_environment() {
    let dir = temp_store_dir("env");
    std::env::set_var("WALKLOOP_STORE_DIR", &dir);
    std::env::set_var("OSRM_BASE_URL", "http://127.0.0.1:5000");
    let config = Config::from_env();
    std::env::remove_var("WALKLOOP_STORE_DIR");
    std::env::remove_var("OSRM_BASE_URL");

    let config = config.unwrap();
    assert_eq!(config.store_dir, dir.to_string_lossy());
    assert_eq!(config.osrm_base_url, "http://127.0.0.1:5000");
    assert!(WalkPlanner::from_config(&config).is_ok());
}
