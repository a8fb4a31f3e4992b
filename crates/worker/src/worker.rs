#![forbid(unsafe_code)]

//! The per-process worker loop: claim, evaluate, record, repeat.

use crate::defaults;
use jm_storage::{SqliteStore, StoreError};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Error type user evaluation callables report.
pub type EvalError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug)]
pub struct WorkerOptions {
    /// Claims older than this count as abandoned and may be reclaimed by
    /// any worker. Never enforced against this process's own evaluation: a
    /// worker that blows past it keeps running and may still land its
    /// result, last write wins.
    pub timeout: Duration,
    /// Sleep between consecutive empty claim attempts.
    pub poll_interval: Duration,
    /// Consecutive empty claim attempts before the loop exits.
    pub max_empty_polls: u32,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            timeout: defaults::CLAIM_TIMEOUT,
            poll_interval: defaults::POLL_INTERVAL,
            max_empty_polls: defaults::MAX_EMPTY_POLLS,
        }
    }
}

/// What one worker process got through before running out of work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub completed: u64,
    pub failed: u64,
}

/// Runs evaluations against `store` until no claimable work remains.
///
/// The user callable is invoked synchronously on the calling thread. An
/// `Err` or a panic from it marks only the job at hand as failed and the
/// loop moves on; store errors are fatal and abort the loop.
pub fn run_worker_loop<F>(
    store: &mut SqliteStore,
    options: &WorkerOptions,
    mut evaluate: F,
) -> Result<WorkerReport, StoreError>
where
    F: FnMut(&Value) -> Result<Value, EvalError>,
{
    let mut report = WorkerReport::default();
    let mut empty_polls = 0u32;

    loop {
        let Some((job_id, argument)) = store.claim_next(options.timeout)? else {
            empty_polls += 1;
            if empty_polls >= options.max_empty_polls {
                tracing::info!(
                    completed = report.completed,
                    failed = report.failed,
                    "no claimable jobs left, worker exiting"
                );
                return Ok(report);
            }
            std::thread::sleep(options.poll_interval);
            continue;
        };
        empty_polls = 0;

        tracing::debug!(job_id = job_id.as_i64(), "claimed job");
        match panic::catch_unwind(AssertUnwindSafe(|| evaluate(&argument))) {
            Ok(Ok(result)) => {
                store.complete(job_id, &result)?;
                report.completed += 1;
            }
            Ok(Err(err)) => {
                tracing::warn!(job_id = job_id.as_i64(), error = %err, "evaluation failed");
                store.fail(job_id, &err.to_string())?;
                report.failed += 1;
            }
            Err(payload) => {
                let description = panic_description(payload.as_ref());
                tracing::warn!(job_id = job_id.as_i64(), error = %description, "evaluation panicked");
                store.fail(job_id, &description)?;
                report.failed += 1;
            }
        }
    }
}

fn panic_description(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("evaluation panicked: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("evaluation panicked: {text}")
    } else {
        "evaluation panicked".to_string()
    }
}
