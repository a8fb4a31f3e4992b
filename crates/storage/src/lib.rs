#![forbid(unsafe_code)]

//! Job coordination store over a single shared SQLite file.
//!
//! Many unsynchronized worker processes open the same path and cooperate
//! through short transactions: a batch is `submit`ted once, then each worker
//! repeatedly claims the lowest pending (or timed-out running) job with
//! [`SqliteStore::claim_next`], evaluates it, and records the outcome with
//! [`SqliteStore::complete`] or [`SqliteStore::fail`].
//!
//! The contract and its limits:
//!
//! - every submitted job is evaluated at least once; a claim is exclusive
//!   only for the caller-chosen timeout, so a slow (not crashed) worker can
//!   be superseded by a reclaim and both workers will write their result,
//!   with the last write winning. Callers whose evaluation is not
//!   idempotent must accept the possibility of duplicate evaluations.
//! - there is no heartbeat: claim liveness is judged purely by wall-clock
//!   age, and recovery from a crashed worker is another worker's reclaim.
//! - all processes must share a filesystem whose locks SQLite can trust;
//!   network filesystems with unreliable locking are not supported.

mod codec;
mod error;
mod jobs;

pub use error::StoreError;
pub use jobs::{JobRow, StatusCounts};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens the job database at `db_path`, creating the file, its parent
    /// directories, and the schema as needed.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self { conn, db_path };
        store.migrate()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jobs (
              id INTEGER PRIMARY KEY,
              args TEXT NOT NULL,
              status TEXT NOT NULL,
              claimed_at_ms INTEGER,
              result TEXT,
              error TEXT,
              created_at_ms INTEGER NOT NULL,
              updated_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status_id ON jobs(status, id);
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            rusqlite::params!["schema_version", "v1"],
        )?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis().min(i64::MAX as u128) as i64
}
