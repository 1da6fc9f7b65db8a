use crate::models::RouteResult;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One accepted suggestion in the walker's log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub steps: u32,
    /// Rounded to two decimals
    pub distance_km: f64,
}

impl HistoryEntry {
    pub fn for_route(route: &RouteResult, timestamp: OffsetDateTime) -> Self {
        HistoryEntry {
            timestamp,
            steps: route.estimated_steps(),
            distance_km: (route.distance_km() * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateSource;
    use uuid::Uuid;

    #[test]
    fn entry_from_route() {
        let route = RouteResult {
            id: Uuid::new_v4(),
            meters: 3456.0,
            seconds: 2600.0,
            geometry: vec![],
            legs: vec![],
            waypoints: vec![],
            source: CandidateSource::Network,
            hash: "h".to_string(),
        };
        let entry = HistoryEntry::for_route(&route, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(entry.steps, 4608);
        assert_eq!(entry.distance_km, 3.46);
    }

    #[test]
    fn serialized_field_names() {
        let entry = HistoryEntry {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            steps: 4000,
            distance_km: 3.0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(json["distanceKm"], 3.0);
        assert_eq!(json["steps"], 4000);
    }
}
