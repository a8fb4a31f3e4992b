#![forbid(unsafe_code)]

//! Fit a line to synthetic data by grid search.
//!
//! Each grid point is one job, so the search can be spread over as many
//! processes as you care to launch. After the local worker drains the
//! store, the best parameters seen so far are printed.

use jm_worker::{WorkerOptions, load_results, submit_and_run};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct LineParams {
    a: f64,
    b: f64,
}

fn linear(x: f64, a: f64, b: f64) -> f64 {
    a * x + b
}

fn objective(xs: &[f64], ys: &[f64], params: &LineParams) -> f64 {
    let total: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let err = y - linear(x, params.a, params.b);
            err * err
        })
        .sum();
    total / xs.len() as f64
}

fn grid(n: usize) -> Vec<LineParams> {
    let step = 1000.0 / (n - 1) as f64;
    let mut out = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            out.push(LineParams {
                a: i as f64 * step,
                b: j as f64 * step,
            });
        }
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let xs: Vec<f64> = (0..1000).map(|i| -100.0 + i as f64 * 0.2).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| linear(x, 123.0, 456.0)).collect();

    let db_path = std::env::temp_dir().join("jobmill_fit_line.db");
    let options = WorkerOptions {
        timeout: Duration::from_secs(60),
        ..WorkerOptions::default()
    };

    submit_and_run(&db_path, &grid(30), &options, |argument| {
        let params: LineParams = serde_json::from_value(argument.clone())?;
        Ok(json!(objective(&xs, &ys, &params)))
    })?;

    let best = load_results(&db_path)?
        .into_iter()
        .filter_map(|(argument, result)| {
            let loss = result.as_f64()?;
            Some((argument, loss))
        })
        .min_by(|(_, left), (_, right)| left.total_cmp(right));

    match best {
        Some((params, loss)) => println!("best fit so far: {params} (mse {loss:.3})"),
        None => println!("no finished evaluations yet"),
    }
    Ok(())
}
