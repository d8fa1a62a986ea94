// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abort specs: cooperative, before-run, and escalated.

use crate::prelude::*;
use serde_json::json;
use serial_test::serial;

#[test]
fn cooperative_abort_reaches_aborted_with_result() {
    let mut project = Project::new();
    project.start_supervisor(2);

    let id = project.submit("ping", &json!({"sleep_seconds": 30.0}));
    let running = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "RUNNING");
    assert!(running, "job never started");

    project.abort(&id);

    let aborted = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "ABORTED");
    assert!(aborted, "abort never took; state {}", project.state_of(&id));

    let job = project.get(&id);
    assert_eq!(job["state_reason"], "user_abort");
    assert_eq!(job["result"]["aborted"], json!(true));

    let manifest = project.manifest(&id, "ping").expect("manifest missing");
    assert_eq!(manifest["state"], "ABORTED");
}

#[test]
fn abort_while_queued_terminates_without_a_run() {
    let mut project = Project::new();
    // Zero workers: the row can never be claimed.
    project.start_supervisor(0);

    let id = project.submit("ping", &json!({"sleep_seconds": 5.0}));
    project.abort(&id);

    let aborted = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "ABORTED");
    assert!(aborted);

    let job = project.get(&id);
    assert_eq!(job["state_reason"], "aborted_before_run");
    assert!(job["worker_id"].is_null(), "row must never have been claimed");
    assert!(project.manifest(&id, "ping").is_some());
}

#[test]
fn abort_is_idempotent() {
    let mut project = Project::new();
    project.start_supervisor(0);

    let id = project.submit("ping", &json!({"sleep_seconds": 5.0}));
    for _ in 0..3 {
        project.abort(&id);
    }

    let aborted = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "ABORTED");
    assert!(aborted);

    // Aborting a terminal job changes nothing.
    let before = project.get(&id);
    project.abort(&id);
    let after = project.get(&id);
    assert_eq!(before["updated_at_ms"], after["updated_at_ms"]);
}

#[test]
#[serial]
fn deaf_handler_is_escalated_to_forceful_abort() {
    let mut project = Project::new();
    project.start_supervisor(2);

    let id = project.submit(
        "ping",
        &json!({"sleep_seconds": 30.0, "ignore_abort": true}),
    );
    let running = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "RUNNING");
    assert!(running, "job never started");

    project.abort(&id);

    // Cooperative deadline (2 s) + grace (0.5 s) + slack.
    let aborted = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "ABORTED");
    assert!(aborted, "escalation never fired; state {}", project.state_of(&id));

    let job = project.get(&id);
    assert_eq!(job["state_reason"], "abort_escalated");

    // The supervisor wrote the receipt on behalf of the killed worker.
    let manifest = project.manifest(&id, "ping").expect("manifest missing");
    assert_eq!(manifest["state"], "ABORTED");
}
