#![forbid(unsafe_code)]

//! Batch entry points: drive evaluations, then read results back.

use crate::worker::{EvalError, WorkerOptions, WorkerReport, run_worker_loop};
use jm_storage::{JobRow, SqliteStore, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Submits `arguments` (only when the store at `db_path` holds no jobs yet)
/// and then works the store to exhaustion in the calling process.
///
/// Launch the same program in several processes against the same path to
/// spread the batch across them: whichever process opens the store first
/// seeds it, the rest just pick up jobs. Re-running after a partial or
/// crashed run resumes the remaining work instead of submitting again.
pub fn submit_and_run<T, F>(
    db_path: impl AsRef<Path>,
    arguments: &[T],
    options: &WorkerOptions,
    evaluate: F,
) -> Result<WorkerReport, StoreError>
where
    T: Serialize,
    F: FnMut(&Value) -> Result<Value, EvalError>,
{
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        values.push(serde_json::to_value(argument).map_err(StoreError::Serialization)?);
    }

    let mut store = SqliteStore::open(db_path)?;
    if let Some(ids) = store.submit_if_empty(&values)? {
        tracing::info!(jobs = ids.len(), "submitted new batch");
    }

    run_worker_loop(&mut store, options, evaluate)
}

/// Reads back (argument, result) pairs for every finished job, in
/// submission order. Pending, running, and failed jobs are skipped.
pub fn load_results(db_path: impl AsRef<Path>) -> Result<Vec<(Value, Value)>, StoreError> {
    let store = SqliteStore::open(db_path)?;
    store.scan_done()
}

/// Reads back every job record, whatever its state.
pub fn load_jobs(db_path: impl AsRef<Path>) -> Result<Vec<JobRow>, StoreError> {
    let store = SqliteStore::open(db_path)?;
    store.list_jobs()
}
