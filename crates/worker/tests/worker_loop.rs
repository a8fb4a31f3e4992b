#![forbid(unsafe_code)]

use jm_core::model::JobStatus;
use jm_storage::SqliteStore;
use jm_worker::{WorkerOptions, load_jobs, load_results, run_worker_loop, submit_and_run};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

fn temp_db(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("jm_worker_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir.join("jobs.db")
}

fn options(timeout: Duration) -> WorkerOptions {
    WorkerOptions {
        timeout,
        poll_interval: Duration::from_millis(10),
        max_empty_polls: 1,
    }
}

#[test]
fn squares_batch_end_to_end() {
    let db = temp_db("squares_batch_end_to_end");
    let report = submit_and_run(
        &db,
        &[0i64, 1, 2],
        &options(Duration::from_secs(60)),
        |argument| {
            let x = argument.as_i64().expect("integer argument");
            Ok(json!(x * x))
        },
    )
    .expect("run batch");

    assert_eq!(report.completed, 3);
    assert_eq!(report.failed, 0);

    let results = load_results(&db).expect("load results");
    assert_eq!(
        results,
        vec![
            (json!(0), json!(0)),
            (json!(1), json!(1)),
            (json!(2), json!(4)),
        ]
    );
}

#[test]
fn rerun_against_finished_store_submits_nothing() {
    let db = temp_db("rerun_against_finished_store_submits_nothing");
    let opts = options(Duration::from_secs(60));

    let first = submit_and_run(&db, &[1i64, 2], &opts, |argument| {
        Ok(json!(argument.as_i64().expect("integer") * 10))
    })
    .expect("first run");
    assert_eq!(first.completed, 2);

    // Same program run again: the store already holds the batch, so no new
    // jobs appear and there is nothing left to claim.
    let second = submit_and_run(&db, &[1i64, 2], &opts, |argument| {
        Ok(json!(argument.as_i64().expect("integer") * 10))
    })
    .expect("second run");
    assert_eq!(second.completed, 0);
    assert_eq!(second.failed, 0);

    assert_eq!(load_results(&db).expect("load results").len(), 2);
}

#[test]
fn failing_argument_does_not_stop_the_batch() {
    let db = temp_db("failing_argument_does_not_stop_the_batch");
    let report = submit_and_run(
        &db,
        &[0i64, 1, 2],
        &options(Duration::from_secs(60)),
        |argument| {
            let x = argument.as_i64().expect("integer argument");
            if x == 1 {
                return Err("unlucky input".into());
            }
            Ok(json!(x + 100))
        },
    )
    .expect("run batch");

    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 1);

    let results = load_results(&db).expect("load results");
    assert_eq!(
        results,
        vec![(json!(0), json!(100)), (json!(2), json!(102))]
    );

    let jobs = load_jobs(&db).expect("load jobs");
    assert_eq!(jobs[1].status, JobStatus::Failed);
    assert_eq!(jobs[1].error.as_deref(), Some("unlucky input"));
    assert_eq!(jobs[0].status, JobStatus::Done);
    assert_eq!(jobs[2].status, JobStatus::Done);
}

#[test]
fn panicking_argument_is_recorded_as_failed() {
    let db = temp_db("panicking_argument_is_recorded_as_failed");
    let report = submit_and_run(
        &db,
        &[0i64, 1],
        &options(Duration::from_secs(60)),
        |argument| {
            let x = argument.as_i64().expect("integer argument");
            assert!(x != 1, "cannot evaluate one");
            Ok(json!(x))
        },
    )
    .expect("run batch");

    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);

    let jobs = load_jobs(&db).expect("load jobs");
    assert_eq!(jobs[1].status, JobStatus::Failed);
    let error = jobs[1].error.as_deref().expect("panic description");
    assert!(error.contains("panicked"), "unexpected error: {error}");
}

#[test]
fn abandoned_claim_is_finished_by_a_second_worker() {
    let db = temp_db("abandoned_claim_is_finished_by_a_second_worker");
    let timeout = Duration::from_millis(50);

    // First worker claims the only job and then "crashes": the claim is
    // never completed, only the clock can release it.
    let mut crashed = SqliteStore::open(&db).expect("open first worker");
    crashed.submit(&[json!(41)]).expect("submit");
    crashed.claim_next(timeout).expect("claim").expect("job 0");

    std::thread::sleep(Duration::from_millis(80));

    let mut second = SqliteStore::open(&db).expect("open second worker");
    let report = run_worker_loop(&mut second, &options(timeout), |argument| {
        Ok(json!(argument.as_i64().expect("integer") + 1))
    })
    .expect("second worker run");

    assert_eq!(report.completed, 1);
    assert_eq!(
        load_results(&db).expect("load results"),
        vec![(json!(41), json!(42))]
    );
}

#[test]
fn unrepresentable_arguments_are_rejected_before_submission() {
    let db = temp_db("unrepresentable_arguments_are_rejected_before_submission");

    // JSON maps take string keys only; the batch must be rejected before
    // anything is written.
    let mut tuple_keyed = std::collections::BTreeMap::new();
    tuple_keyed.insert((1i32, 2i32), "x");
    let err = submit_and_run(
        &db,
        &[tuple_keyed],
        &options(Duration::from_secs(60)),
        |_| Ok(json!(null)),
    )
    .expect_err("tuple keys are not representable");
    assert!(matches!(err, jm_storage::StoreError::Serialization(_)));

    assert!(load_jobs(&db).expect("load jobs").is_empty());
}
