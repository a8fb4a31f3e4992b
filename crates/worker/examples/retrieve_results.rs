#![forbid(unsafe_code)]

//! Print every finished evaluation recorded in a store file.
//!
//! Usage: `cargo run --example retrieve_results -- /path/to/jobs.db`

use jm_core::model::JobStatus;
use jm_worker::load_jobs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = std::env::args()
        .nth(1)
        .ok_or("usage: retrieve_results <store-path>")?;

    for job in load_jobs(&db_path)? {
        if job.status != JobStatus::Done {
            continue;
        }
        let result = job.result.unwrap_or(serde_json::Value::Null);
        println!(
            "Evaluation {}. Finished at {} ms. Returned '{}'.",
            job.id, job.updated_at_ms, result
        );
    }
    Ok(())
}
