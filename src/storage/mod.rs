mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::constants::{HISTORY_CAPACITY, HISTORY_KEY, SEEN_KEY};
use crate::error::Result;
use crate::models::{HistoryEntry, RouteResult};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use time::OffsetDateTime;

/// String key-value persistence, as offered by the host environment.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// History log and seen-route set on top of a [`KeyValueStore`].
///
/// Values that fail to parse are treated as absent rather than as errors.
#[derive(Clone)]
pub struct SuggestionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SuggestionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        SuggestionStore { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Newest first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.load_json(HISTORY_KEY).await?.unwrap_or_default())
    }

    pub async fn seen_hashes(&self) -> Result<HashSet<String>> {
        let hashes: Vec<String> = self.load_json(SEEN_KEY).await?.unwrap_or_default();
        Ok(hashes.into_iter().collect())
    }

    /// Log an accepted route and mark its hash as seen.
    pub async fn record(&self, route: &RouteResult, at: OffsetDateTime) -> Result<HistoryEntry> {
        let entry = HistoryEntry::for_route(route, at);

        let mut history = self.history().await?;
        history.insert(0, entry.clone());
        history.truncate(HISTORY_CAPACITY);
        self.backend
            .set(HISTORY_KEY, &serde_json::to_string(&history)?)
            .await?;

        let mut seen: Vec<String> = self.load_json(SEEN_KEY).await?.unwrap_or_default();
        if !seen.contains(&route.hash) {
            seen.push(route.hash.clone());
            self.backend
                .set(SEEN_KEY, &serde_json::to_string(&seen)?)
                .await?;
        }

        tracing::debug!(
            backend = self.backend_name(),
            history = history.len(),
            seen = seen.len(),
            "Recorded route {}",
            route.hash
        );
        Ok(entry)
    }

    /// Forget both the history and the seen set.
    pub async fn clear(&self) -> Result<()> {
        self.backend.remove(HISTORY_KEY).await?;
        self.backend.remove(SEEN_KEY).await?;
        tracing::info!(backend = self.backend_name(), "Cleared suggestion history");
        Ok(())
    }

    async fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = key, error = %e, "Ignoring unreadable value for {}: {}", key, e);
                Ok(None)
            }
        }
    }
}
