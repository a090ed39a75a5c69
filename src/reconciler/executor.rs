//! # Bounded Concurrency Executor
//!
//! Runs jobs in a fixed number of sequential lanes.
//!
//! ```text
//! jobs:   j0 j1 j2 j3 j4 j5 j6      max_parallel = 3
//! lane 0: j0 → j3 → j6
//! lane 1: j1 → j4
//! lane 2: j2 → j5
//! ```
//!
//! Lanes are joined on the calling task, so no more than `max_parallel` jobs
//! are in flight. A failed job is logged and recorded; its lane moves on.

use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use tracing::error;

/// Run `jobs` in at most `max_parallel` concurrent lanes
///
/// Jobs are dealt round-robin; results come back lane by lane, in lane order.
/// A `max_parallel` of zero is treated as one.
pub async fn run_lanes<I, F, T, E>(jobs: I, max_parallel: usize) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let lane_count = max_parallel.max(1);
    let mut lanes: Vec<Vec<F>> = (0..lane_count).map(|_| Vec::new()).collect();
    for (index, job) in jobs.into_iter().enumerate() {
        lanes[index % lane_count].push(job);
    }

    let lane_results = join_all(lanes.into_iter().enumerate().map(|(lane, jobs)| async move {
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = job.await;
            if let Err(e) = &result {
                error!("Job in lane {} failed: {:#}", lane, e);
            }
            results.push(result);
        }
        results
    }))
    .await;

    lane_results.into_iter().flatten().collect()
}

/// Split results into successes and the number of failures
pub fn partition_results<T, E>(results: Vec<Result<T, E>>) -> (Vec<T>, usize) {
    let mut ok = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(value) => ok.push(value),
            Err(_) => failed += 1,
        }
    }
    (ok, failed)
}
