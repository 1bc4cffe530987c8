//! Travel cache: freshness-windowed lookups over a pluggable store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::model::Measurement;
use crate::traits::CacheStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub origin: String,
    pub destination: String,
    pub measurement: Measurement,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        measurement: Measurement,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            measurement,
            stored_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Entries older than this many days are treated as absent.
    pub freshness_days: i64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { freshness_days: 30 }
    }
}

/// The only component that talks to the cache store.
///
/// Store failures never propagate: a failed read is a miss and a failed
/// write is logged and dropped.
#[derive(Debug)]
pub struct TravelCache<S> {
    store: S,
    freshness: Duration,
}

impl<S: CacheStore> TravelCache<S> {
    pub fn new(store: S, options: &CacheOptions) -> Self {
        Self {
            store,
            freshness: Duration::days(options.freshness_days),
        }
    }

    pub fn store_ref(&self) -> &S {
        &self.store
    }

    pub fn lookup(&self, origin: &str, destination: &str) -> Option<Measurement> {
        self.lookup_at(origin, destination, Utc::now())
    }

    /// Lookup relative to an explicit clock.
    pub fn lookup_at(
        &self,
        origin: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Option<Measurement> {
        let entry = match self.store.fetch(origin, destination) {
            Ok(entry) => entry?,
            Err(err) => {
                warn!(origin, destination, error = %err, "travel cache read failed");
                return None;
            }
        };

        if entry.stored_at <= now - self.freshness {
            debug!(origin, destination, stored_at = %entry.stored_at, "travel cache entry stale");
            return None;
        }

        Some(entry.measurement)
    }

    pub fn store(&self, origin: &str, destination: &str, measurement: Measurement) {
        let entry = CacheEntry::new(origin, destination, measurement, Utc::now());
        if let Err(err) = self.store.upsert(&entry) {
            warn!(origin, destination, error = %err, "travel cache write failed");
        }
    }

    /// Explicit eviction of entries past the freshness window.
    pub fn prune_stale(&self) -> usize {
        match self.store.prune(Utc::now() - self.freshness) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(error = %err, "travel cache prune failed");
                0
            }
        }
    }
}

/// In-process store. Useful for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn fetch(&self, origin: &str, destination: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries
            .get(&(origin.to_string(), destination.to_string()))
            .cloned())
    }

    fn upsert(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            (entry.origin.clone(), entry.destination.clone()),
            entry.clone(),
        );
        Ok(())
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at >= cutoff);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TravelCache<MemoryCacheStore> {
        TravelCache::new(MemoryCacheStore::new(), &CacheOptions::default())
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = cache();
        cache.store("A", "B", Measurement::new(5000, 600));
        assert_eq!(cache.lookup("A", "B"), Some(Measurement::new(5000, 600)));
        // Keys are directional.
        assert_eq!(cache.lookup("B", "A"), None);
    }

    #[test]
    fn test_entry_older_than_window_is_absent() {
        let cache = cache();
        let now = Utc::now();
        cache
            .store_ref()
            .upsert(&CacheEntry::new(
                "A",
                "B",
                Measurement::new(100, 60),
                now - Duration::days(31),
            ))
            .unwrap();

        assert_eq!(cache.lookup_at("A", "B", now), None);
    }

    #[test]
    fn test_entry_inside_window_is_present() {
        let cache = cache();
        let now = Utc::now();
        cache
            .store_ref()
            .upsert(&CacheEntry::new(
                "A",
                "B",
                Measurement::new(100, 60),
                now - Duration::days(29),
            ))
            .unwrap();

        assert_eq!(cache.lookup_at("A", "B", now), Some(Measurement::new(100, 60)));
    }

    #[test]
    fn test_repeated_store_overwrites() {
        let cache = cache();
        cache.store("A", "B", Measurement::new(100, 60));
        cache.store("A", "B", Measurement::new(100, 60));
        cache.store("A", "B", Measurement::new(120, 70));
        assert_eq!(cache.store_ref().len(), 1);
        assert_eq!(cache.lookup("A", "B"), Some(Measurement::new(120, 70)));
    }

    #[test]
    fn test_prune_stale_removes_old_rows() {
        let cache = cache();
        let now = Utc::now();
        cache
            .store_ref()
            .upsert(&CacheEntry::new("A", "B", Measurement::new(1, 1), now - Duration::days(40)))
            .unwrap();
        cache.store("C", "D", Measurement::new(2, 2));

        assert_eq!(cache.prune_stale(), 1);
        assert_eq!(cache.store_ref().len(), 1);
    }
}
