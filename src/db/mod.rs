//! SQLite-backed persisted store shared by the twin services.
//!
//! The database lives at `~/.slopetwin/slopetwin.db` (overridable via
//! `TWIN_DB_PATH`). Four processes coordinate only through this file: the
//! weather poller and sensor simulator append observations, the control loop
//! appends twin-state rows, and the query API reads. WAL mode keeps
//! concurrent readers cheap while each writer commits its own rows;
//! last-write-wins per table is expected and acceptable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

pub mod types;
pub use types::*;

mod readings;
mod subs;
mod twin_state;
mod weather;

pub struct TwinDb {
    conn: Connection,
}

impl TwinDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default path and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for concurrent readers while a writer commits
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        Ok(Self { conn })
    }

    /// Open the database in read-only mode. Used by the query API for safe
    /// concurrent reads while the ingesters and the loop own writes.
    pub fn open_readonly() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_readonly_at(&path)
    }

    /// Open a database at an explicit path in read-only mode.
    pub fn open_readonly_at(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Startup handshake for ingestion-side processes: bounded retry with a
    /// fixed delay, then give up. Exhausting retries is fatal to the caller.
    pub fn open_with_retry(max_tries: u32, delay: Duration) -> Result<Self, DbError> {
        for attempt in 1..=max_tries {
            match Self::open() {
                Ok(db) => return Ok(db),
                Err(e) => {
                    log::warn!("Store not ready, retry {}/{}: {}", attempt, max_tries, e);
                    std::thread::sleep(delay);
                }
            }
        }
        Err(DbError::RetriesExhausted(max_tries))
    }

    /// Resolve the database path: `TWIN_DB_PATH` when set, otherwise
    /// `~/.slopetwin/slopetwin.db`.
    pub fn db_path() -> Result<PathBuf, DbError> {
        if let Ok(path) = std::env::var("TWIN_DB_PATH") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".slopetwin").join("slopetwin.db"))
    }
}

/// Shared timestamp format for all writers, UTC.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::TwinDb;
    use tempfile::TempDir;

    /// A fresh database in a temp dir, kept alive for the test's duration.
    pub fn open_temp_db() -> (TempDir, TwinDb) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = TwinDb::open_at(dir.path().join("twin.db")).expect("open db");
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let (_dir, db) = test_util::open_temp_db();
        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM twin_state", [], |row| row.get(0))
            .expect("twin_state exists");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let (_dir, db) = test_util::open_temp_db();
        let result: Result<(), DbError> = db.with_transaction(|db| {
            db.conn_ref()
                .execute("INSERT INTO alert_subs (email) VALUES ('a@b.c')", [])?;
            Err(DbError::Migration("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM alert_subs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
