#![forbid(unsafe_code)]

//! Smallest possible batch: greet one hundred integers.
//!
//! Launch several copies of this program at once; they share the batch
//! through the store file and each greets a disjoint subset.

use jm_worker::{WorkerOptions, submit_and_run};
use serde_json::json;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let arguments: Vec<i64> = (0..100).collect();

    let options = WorkerOptions {
        timeout: Duration::from_secs(60),
        ..WorkerOptions::default()
    };

    let report = submit_and_run(
        std::env::temp_dir().join("jobmill_hello_world.db"),
        &arguments,
        &options,
        |argument| {
            println!("Hello world: {argument}");
            std::thread::sleep(Duration::from_secs(2));
            Ok(json!(null))
        },
    )?;

    println!(
        "completed {} jobs ({} failed)",
        report.completed, report.failed
    );
    Ok(())
}
