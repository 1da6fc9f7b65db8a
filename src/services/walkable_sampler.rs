use crate::constants::*;
use crate::models::Point;
use crate::services::overpass::WalkableSource;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Single cached sample, replaced whenever the fingerprint changes.
#[derive(Debug, Clone)]
struct CacheSlot {
    key: String,
    points: Arc<Vec<Point>>,
}

/// Fetches walkable-network points around a start point, remembering the
/// last result.
///
/// Lookups are raced against a soft timeout. A lookup that loses the race is
/// detached rather than aborted, so it can still fill the cache for the next
/// call.
#[derive(Clone)]
pub struct WalkableSampler {
    source: Arc<dyn WalkableSource>,
    slot: Arc<Mutex<Option<CacheSlot>>>,
    soft_timeout: Duration,
}

impl WalkableSampler {
    pub fn new(source: Arc<dyn WalkableSource>, soft_timeout: Duration) -> Self {
        WalkableSampler {
            source,
            slot: Arc::new(Mutex::new(None)),
            soft_timeout,
        }
    }

    /// Search radius for a target distance, clamped to the sampler bounds.
    pub fn search_radius(target_meters: f64, radius_scale: f64) -> f64 {
        (target_meters * SAMPLER_RADIUS_FACTOR * radius_scale)
            .clamp(SAMPLER_MIN_RADIUS_M, SAMPLER_MAX_RADIUS_M)
    }

    /// Fingerprint of start (4 decimals) and radius (100 m buckets).
    pub fn cache_key(start: Point, radius_m: f64) -> String {
        let radius_bucket =
            (radius_m / SAMPLER_RADIUS_BUCKET_M).round() * SAMPLER_RADIUS_BUCKET_M;
        format!("{:.4}:{:.4}:{:.0}", start.lat, start.lng, radius_bucket)
    }

    /// Cached points for `key`, if the slot currently holds them.
    pub fn cached(&self, key: &str) -> Option<Arc<Vec<Point>>> {
        let slot = self.slot.lock().ok()?;
        slot.as_ref()
            .filter(|entry| entry.key == key)
            .map(|entry| entry.points.clone())
    }

    /// Walkable points around `start`. Never fails: collaborator errors and
    /// soft timeouts both produce an empty sample.
    pub async fn sample(
        &self,
        start: Point,
        target_meters: f64,
        radius_scale: f64,
    ) -> Arc<Vec<Point>> {
        let radius_m = Self::search_radius(target_meters, radius_scale);
        let key = Self::cache_key(start, radius_m);

        if let Some(points) = self.cached(&key) {
            tracing::debug!(
                key = %key,
                points = points.len(),
                "Walkable cache hit: {} points",
                points.len()
            );
            return points;
        }

        let source = self.source.clone();
        let slot = self.slot.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            fetch_and_store(source, slot, task_key, start, radius_m).await
        });

        match tokio::time::timeout(self.soft_timeout, handle).await {
            Ok(Ok(points)) => points,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Walkable sampling task failed: {}", e);
                Arc::new(Vec::new())
            }
            Err(_) => {
                // The task keeps running and may still fill the cache
                tracing::warn!(
                    key = %key,
                    timeout_ms = self.soft_timeout.as_millis() as u64,
                    "Walkable sampling exceeded {}ms, continuing without network points",
                    self.soft_timeout.as_millis()
                );
                Arc::new(Vec::new())
            }
        }
    }
}

async fn fetch_and_store(
    source: Arc<dyn WalkableSource>,
    slot: Arc<Mutex<Option<CacheSlot>>>,
    key: String,
    start: Point,
    radius_m: f64,
) -> Arc<Vec<Point>> {
    let points = match source.walkable_points(start, radius_m).await {
        Ok(points) => points,
        Err(e) => {
            tracing::warn!(
                error = %e,
                radius_m = %format!("{:.0}", radius_m),
                "All walkable-point sources failed: {}",
                e
            );
            Vec::new()
        }
    };

    // Empty results are cached too, so failures are not retried every call
    let points = Arc::new(points);
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(CacheSlot {
            key,
            points: points.clone(),
        });
    }
    points
}
