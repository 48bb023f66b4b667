//! SQLite-based location history storage.
//!
//! History is unbounded and ordered newest-first; insertion order is the
//! source of truth (`rowid` descending), not the fix timestamp.

use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

use super::data_dir;
use crate::error::DatabaseError;
use crate::sample::LocationSample;

/// SQLite database holding the recorded location samples.
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the database at `~/.config/waylog/waylog.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::OpenFailed {
                path: "~/.config/waylog".into(),
                source: rusqlite::Error::InvalidPath(e.to_string().into()),
            })?
            .join("waylog.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS locations (
                    id INTEGER NOT NULL,
                    lat REAL NOT NULL,
                    long REAL NOT NULL,
                    datetime TEXT NOT NULL,
                    title TEXT NOT NULL,
                    recorded_at TEXT NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Append a sample. The newest sample is the last inserted row.
    pub fn insert(&self, sample: &LocationSample) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO locations (id, lat, long, datetime, title, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sample.id,
                sample.lat,
                sample.long,
                sample.datetime,
                sample.title,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All samples, newest first.
    pub fn list(&self) -> Result<Vec<LocationSample>, DatabaseError> {
        self.list_limit(None)
    }

    /// Newest `limit` samples (all when `None`), newest first.
    pub fn list_limit(&self, limit: Option<u32>) -> Result<Vec<LocationSample>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lat, long, datetime, title FROM locations
             ORDER BY rowid DESC LIMIT ?1",
        )?;
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = stmt.query_map(params![limit], |row| {
            Ok(LocationSample {
                id: row.get(0)?,
                lat: row.get(1)?,
                long: row.get(2)?,
                datetime: row.get(3)?,
                title: row.get(4)?,
            })
        })?;
        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }

    pub fn len(&self) -> Result<u64, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.len()? == 0)
    }

    /// Delete all samples.
    pub fn clear(&self) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM locations", [])?;
        Ok(())
    }

    /// Replace the whole history with the given samples (newest first),
    /// backing the unguarded history setter.
    pub fn replace_all(&self, samples: &[LocationSample]) -> Result<(), DatabaseError> {
        self.clear()?;
        for sample in samples.iter().rev() {
            self.insert(sample)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PositionFix;

    fn sample(lat: f64, long: f64, time: i64) -> LocationSample {
        LocationSample::from_fix(&PositionFix { lat, long, time })
    }

    #[test]
    fn insert_then_list_is_newest_first() {
        let db = HistoryDb::open_memory().unwrap();
        db.insert(&sample(1.0, 1.0, 100)).unwrap();
        db.insert(&sample(2.0, 2.0, 200)).unwrap();
        db.insert(&sample(3.0, 3.0, 300)).unwrap();

        let list = db.list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id, 300);
        assert_eq!(list[2].id, 100);
    }

    #[test]
    fn list_limit_returns_newest() {
        let db = HistoryDb::open_memory().unwrap();
        for i in 0..5 {
            db.insert(&sample(i as f64, 0.0, i)).unwrap();
        }
        let list = db.list_limit(Some(2)).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, 4);
        assert_eq!(list[1].id, 3);
    }

    #[test]
    fn clear_empties_history() {
        let db = HistoryDb::open_memory().unwrap();
        db.insert(&sample(1.0, 1.0, 1)).unwrap();
        assert!(!db.is_empty().unwrap());
        db.clear().unwrap();
        assert!(db.is_empty().unwrap());
    }

    #[test]
    fn replace_all_preserves_order() {
        let db = HistoryDb::open_memory().unwrap();
        db.insert(&sample(9.0, 9.0, 900)).unwrap();

        let newest_first = vec![sample(3.0, 3.0, 300), sample(2.0, 2.0, 200)];
        db.replace_all(&newest_first).unwrap();
        let list = db.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, 300);
        assert_eq!(list[1].id, 200);
    }

    #[test]
    fn reopen_keeps_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waylog.db");
        {
            let db = HistoryDb::open_at(&path).unwrap();
            db.insert(&sample(1.0, 2.0, 42)).unwrap();
        }
        let db = HistoryDb::open_at(&path).unwrap();
        let list = db.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, 42);
    }
}
