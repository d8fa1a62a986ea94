// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor crash and recovery specs.

use crate::prelude::*;
use serde_json::json;
use serial_test::serial;

#[test]
fn queued_jobs_survive_a_supervisor_restart() {
    let mut project = Project::new();

    let id = project.submit("ping", &json!({"sleep_seconds": 0.2}));
    assert_eq!(project.state_of(&id), "QUEUED");

    project.start_supervisor(1);
    let done = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "SUCCEEDED");
    assert!(done, "queued job was lost across startup");
}

#[test]
#[serial]
fn dead_worker_is_orphaned_after_supervisor_restart() {
    let mut project = Project::new();
    project.start_supervisor(1);

    let id = project.submit("ping", &json!({"sleep_seconds": 60.0}));
    let running = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "RUNNING");
    assert!(running, "job never started");

    // Crash the supervisor, then kill the worker so heartbeats stop.
    project.kill_supervisor();
    let pid = project.get(&id)["worker_pid"].as_u64().expect("worker pid") as i32;
    sigkill(pid);

    project.start_supervisor(1);

    // Heartbeat timeout is 3 s in the spec config; allow generous slack.
    let orphaned = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "ORPHANED");
    assert!(orphaned, "stale row never orphaned; state {}", project.state_of(&id));

    let job = project.get(&id);
    assert_eq!(job["state_reason"], "heartbeat_timeout");
    assert!(project.manifest(&id, "ping").is_some());
}

#[test]
#[serial]
fn live_worker_finishes_across_supervisor_restart() {
    let mut project = Project::new();
    project.start_supervisor(1);

    let id = project.submit("ping", &json!({"sleep_seconds": 2.0}));
    let running = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "RUNNING");
    assert!(running, "job never started");

    // The supervisor dies; the worker keeps heartbeating and finishes.
    project.kill_supervisor();
    project.start_supervisor(1);

    let done = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "SUCCEEDED");
    assert!(done, "live worker was not allowed to finish; state {}", project.state_of(&id));
    assert_eq!(project.get(&id)["result"], json!({"slept_seconds": 2.0}));
}

/// SIGKILL a pid via the `kill` utility (keeps the spec crate signal-free).
fn sigkill(pid: i32) {
    let _ = std::process::Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status();
}
