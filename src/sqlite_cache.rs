//! SQLite-backed travel cache store.
//!
//! Opens one connection per operation so the store can be shared across
//! threads and processes without an outer lock. Concurrent writers of the
//! same pair simply overwrite each other.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::CacheEntry;
use crate::error::CacheError;
use crate::model::Measurement;
use crate::traits::CacheStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    db_path: PathBuf,
}

impl SqliteCacheStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };

        let conn = store.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS travel_cache (
                origin TEXT NOT NULL,
                destination TEXT NOT NULL,
                distance_meters INTEGER NOT NULL,
                duration_seconds INTEGER NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (origin, destination)
            );
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_travel_cache_stored_at ON travel_cache(stored_at);",
            [],
        )?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, CacheError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl CacheStore for SqliteCacheStore {
    fn fetch(&self, origin: &str, destination: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.connect()?;
        let row: Option<(i64, i64, i64)> = conn
            .query_row(
                "SELECT distance_meters, duration_seconds, stored_at FROM travel_cache WHERE origin = ?1 AND destination = ?2",
                params![origin, destination],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((distance, duration, stored_at)) = row else {
            return Ok(None);
        };

        let measurement = Measurement::new(
            u32::try_from(distance).map_err(|_| CacheError::Corrupt(format!("distance {distance}")))?,
            u32::try_from(duration).map_err(|_| CacheError::Corrupt(format!("duration {duration}")))?,
        );
        let stored_at = DateTime::<Utc>::from_timestamp(stored_at, 0)
            .ok_or_else(|| CacheError::Corrupt(format!("timestamp {stored_at}")))?;

        Ok(Some(CacheEntry::new(origin, destination, measurement, stored_at)))
    }

    fn upsert(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO travel_cache (origin, destination, distance_meters, duration_seconds, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(origin, destination) DO UPDATE SET
                distance_meters = excluded.distance_meters,
                duration_seconds = excluded.duration_seconds,
                stored_at = excluded.stored_at
            "#,
            params![
                &entry.origin,
                &entry.destination,
                i64::from(entry.measurement.distance_meters),
                i64::from(entry.measurement.duration_seconds),
                entry.stored_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM travel_cache WHERE stored_at < ?1",
            params![cutoff.timestamp()],
        )?;
        Ok(removed)
    }
}
