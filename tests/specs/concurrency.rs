// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency-bound specs.

use crate::prelude::*;
use serde_json::json;

#[test]
fn at_most_max_workers_jobs_run_at_once() {
    let mut project = Project::new();
    project.start_supervisor(2);

    let ids: Vec<String> = (0..5)
        .map(|_| project.submit("ping", &json!({"sleep_seconds": 1.0})))
        .collect();

    // While draining, the RUNNING count never exceeds the cap.
    let mut peak = 0;
    let drained = wait_for(60_000, || {
        let running = project.count_in_state("running");
        peak = peak.max(running);
        assert!(running <= 2, "concurrency cap violated: {running} running");
        ids.iter().all(|id| project.state_of(id) == "SUCCEEDED")
    });
    assert!(drained, "jobs never drained");
    assert!(peak > 0, "never observed a running job");
}

#[test]
fn claims_follow_submission_order() {
    let mut project = Project::new();
    // One worker: strict serial execution in FIFO order.
    project.start_supervisor(1);

    let ids: Vec<String> = (0..3)
        .map(|_| project.submit("ping", &json!({"sleep_seconds": 0.3})))
        .collect();

    let drained = wait_for(60_000, || {
        ids.iter().all(|id| project.state_of(id) == "SUCCEEDED")
    });
    assert!(drained, "jobs never drained");

    let started: Vec<u64> = ids
        .iter()
        .map(|id| project.get(id)["claimed_at_ms"].as_u64().unwrap())
        .collect();
    assert!(started[0] <= started[1] && started[1] <= started[2],
        "claims out of submission order: {started:?}");
}
