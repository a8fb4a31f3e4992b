#![forbid(unsafe_code)]

//! Worker-side half of jobmill: the claim/evaluate/record loop and the
//! batch entry points.
//!
//! Parallelism comes from running more worker processes against the same
//! store path, never from threads inside one process. A typical program
//! calls [`submit_and_run`] and is itself launched N times.

pub mod defaults;
mod entry;
mod worker;

pub use entry::{load_jobs, load_results, submit_and_run};
pub use worker::{EvalError, WorkerOptions, WorkerReport, run_worker_loop};
