#![forbid(unsafe_code)]

//! Job lifecycle operations: submission, the atomic claim protocol, result
//! persistence, and the read paths over finished work.

use crate::{SqliteStore, StoreError, codec, now_ms};
use jm_core::ids::JobId;
use jm_core::model::JobStatus;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};
use serde_json::Value;
use std::time::Duration;

// A busy conflict is expected whenever two workers poll together; retry a
// few times on top of the connection's busy handler before surfacing
// `Unavailable`.
const WRITE_TX_ATTEMPTS: u32 = 3;

/// One job record as stored, with its payloads decoded.
#[derive(Clone, Debug)]
pub struct JobRow {
    pub id: JobId,
    pub status: JobStatus,
    pub argument: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub claimed_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// How many jobs sit in each lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
}

impl SqliteStore {
    /// Inserts one pending job per argument, in argument order, in a single
    /// transaction. Ids continue from the current maximum; every call
    /// appends a fresh batch, nothing is deduplicated.
    pub fn submit(&mut self, arguments: &[Value]) -> Result<Vec<JobId>, StoreError> {
        let mut encoded = Vec::with_capacity(arguments.len());
        for argument in arguments {
            encoded.push(codec::encode(argument)?);
        }

        self.with_write_tx(|tx| {
            let now = now_ms();
            let base: i64 =
                tx.query_row("SELECT COALESCE(MAX(id) + 1, 0) FROM jobs", [], |row| {
                    row.get(0)
                })?;

            let mut ids = Vec::with_capacity(encoded.len());
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO jobs(id, args, status, claimed_at_ms, result, error, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, 'PENDING', NULL, NULL, NULL, ?3, ?3)
                "#,
            )?;
            for (offset, args_text) in encoded.iter().enumerate() {
                let id = base + offset as i64;
                stmt.execute(params![id, args_text, now])?;
                ids.push(stored_job_id(id)?);
            }
            Ok(ids)
        })
    }

    /// Seeds the store with `arguments` only when it holds no jobs at all.
    /// Count and insert happen in one transaction, so concurrent seeders
    /// racing to open the same fresh store cannot double-submit; the losers
    /// get `None` and just work the batch.
    pub fn submit_if_empty(
        &mut self,
        arguments: &[Value],
    ) -> Result<Option<Vec<JobId>>, StoreError> {
        let mut encoded = Vec::with_capacity(arguments.len());
        for argument in arguments {
            encoded.push(codec::encode(argument)?);
        }

        self.with_write_tx(|tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(1) FROM jobs", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(None);
            }

            let now = now_ms();
            let mut ids = Vec::with_capacity(encoded.len());
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO jobs(id, args, status, claimed_at_ms, result, error, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, 'PENDING', NULL, NULL, NULL, ?3, ?3)
                "#,
            )?;
            for (offset, args_text) in encoded.iter().enumerate() {
                let id = offset as i64;
                stmt.execute(params![id, args_text, now])?;
                ids.push(stored_job_id(id)?);
            }
            Ok(Some(ids))
        })
    }

    /// Atomically claims the lowest-id job that is either pending or whose
    /// running claim is older than `timeout`, marks it running with a fresh
    /// claim timestamp, and returns its argument.
    ///
    /// `Ok(None)` means nothing is claimable right now: the store may be
    /// empty, fully finished, or every live claim may still be fresh. Poll
    /// again later or stop; it is not an error.
    pub fn claim_next(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<(JobId, Value)>, StoreError> {
        let timeout_ms = timeout.as_millis().min(i64::MAX as u128) as i64;

        self.with_write_tx(|tx| {
            let now = now_ms();
            let stale_before = now.saturating_sub(timeout_ms);

            let row: Option<(i64, String, String, Option<i64>)> = tx
                .query_row(
                    r#"
                    SELECT id, args, status, claimed_at_ms
                    FROM jobs
                    WHERE status = 'PENDING'
                       OR (status = 'RUNNING' AND claimed_at_ms <= ?1)
                    ORDER BY id ASC
                    LIMIT 1
                    "#,
                    params![stale_before],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;

            let Some((id, args_text, status, claimed_at_ms)) = row else {
                return Ok(None);
            };

            if status == JobStatus::Running.as_str() {
                let inactive_ms = now.saturating_sub(claimed_at_ms.unwrap_or(0));
                tracing::info!(
                    job_id = id,
                    inactive_s = inactive_ms / 1_000,
                    "reclaiming stale job"
                );
            }

            tx.execute(
                "UPDATE jobs SET status = 'RUNNING', claimed_at_ms = ?2, updated_at_ms = ?2 WHERE id = ?1",
                params![id, now],
            )?;

            let argument = codec::decode(Some(&args_text))?;
            Ok(Some((stored_job_id(id)?, argument)))
        })
    }

    /// Marks a job done and stores its result. The update is unconditional:
    /// a worker that outlived its claim may still land its result after a
    /// reclaim, and the last writer wins.
    pub fn complete(&mut self, id: JobId, result: &Value) -> Result<(), StoreError> {
        let result_text = codec::encode(result)?;
        self.with_write_tx(|tx| {
            let changed = tx.execute(
                "UPDATE jobs SET status = 'DONE', result = ?2, error = NULL, updated_at_ms = ?3 WHERE id = ?1",
                params![id.as_i64(), result_text, now_ms()],
            )?;
            if changed != 1 {
                return Err(StoreError::UnknownJob(id));
            }
            Ok(())
        })
    }

    /// Marks a job failed with the worker-reported description. Failed jobs
    /// are terminal: the claim scan never returns them again, so retrying
    /// one means re-submitting it.
    pub fn fail(&mut self, id: JobId, error: &str) -> Result<(), StoreError> {
        self.with_write_tx(|tx| {
            let changed = tx.execute(
                "UPDATE jobs SET status = 'FAILED', error = ?2, updated_at_ms = ?3 WHERE id = ?1",
                params![id.as_i64(), error, now_ms()],
            )?;
            if changed != 1 {
                return Err(StoreError::UnknownJob(id));
            }
            Ok(())
        })
    }

    /// Collects (argument, result) pairs for every finished job, in id
    /// order. A fresh call re-scans from the start.
    pub fn scan_done(&self) -> Result<Vec<(Value, Value)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT args, result FROM jobs WHERE status = 'DONE' ORDER BY id ASC")?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let args_text: String = row.get(0)?;
            let result_text: Option<String> = row.get(1)?;
            let argument = codec::decode(Some(&args_text))?;
            let result = codec::decode(result_text.as_deref())?;
            out.push((argument, result));
        }
        Ok(out)
    }

    /// Every record in the store, in id order, whatever its state.
    pub fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, args, status, claimed_at_ms, result, error, created_at_ms, updated_at_ms
            FROM jobs
            ORDER BY id ASC
            "#,
        )?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let args_text: String = row.get(1)?;
            let status_text: String = row.get(2)?;
            let claimed_at_ms: Option<i64> = row.get(3)?;
            let result_text: Option<String> = row.get(4)?;
            let error: Option<String> = row.get(5)?;
            let created_at_ms: i64 = row.get(6)?;
            let updated_at_ms: i64 = row.get(7)?;

            let status = JobStatus::parse(&status_text)
                .ok_or(StoreError::InvalidInput("unknown status in store"))?;
            let result = match result_text.as_deref() {
                None => None,
                Some(text) => Some(codec::decode(Some(text))?),
            };

            out.push(JobRow {
                id: stored_job_id(id)?,
                status,
                argument: codec::decode(Some(&args_text))?,
                result,
                error,
                claimed_at_ms,
                created_at_ms,
                updated_at_ms,
            });
        }
        Ok(out)
    }

    pub fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(1) FROM jobs GROUP BY status")?;
        let mut rows = stmt.query([])?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next()? {
            let status_text: String = row.get(0)?;
            let count = row.get::<_, i64>(1)?.max(0) as u64;
            match JobStatus::parse(&status_text) {
                Some(JobStatus::Pending) => counts.pending = count,
                Some(JobStatus::Running) => counts.running = count,
                Some(JobStatus::Done) => counts.done = count,
                Some(JobStatus::Failed) => counts.failed = count,
                None => return Err(StoreError::InvalidInput("unknown status in store")),
            }
        }
        Ok(counts)
    }

    pub fn count_jobs(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM jobs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Runs `f` inside an IMMEDIATE transaction so the read-then-write
    /// claim path serializes against other processes, retrying busy
    /// conflicts a bounded number of times.
    fn with_write_tx<T>(
        &mut self,
        f: impl Fn(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let tx = match self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
            {
                Ok(tx) => tx,
                Err(err) if attempt < WRITE_TX_ATTEMPTS && is_busy(&err) => continue,
                Err(err) => return Err(StoreError::Unavailable(err)),
            };

            match f(&tx) {
                Ok(value) => match tx.commit() {
                    Ok(()) => return Ok(value),
                    Err(err) if attempt < WRITE_TX_ATTEMPTS && is_busy(&err) => continue,
                    Err(err) => return Err(StoreError::Unavailable(err)),
                },
                Err(StoreError::Unavailable(err))
                    if attempt < WRITE_TX_ATTEMPTS && is_busy(&err) =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

fn stored_job_id(id: i64) -> Result<JobId, StoreError> {
    JobId::try_new(id).map_err(|_| StoreError::InvalidInput("negative job id in store"))
}
