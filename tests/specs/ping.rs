// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-trip specs: submit, run, evidence.

use crate::prelude::*;
use serde_json::json;

#[test]
fn ping_round_trip_succeeds_with_evidence() {
    let mut project = Project::new();
    project.start_supervisor(2);

    let id = project.submit("ping", &json!({"sleep_seconds": 0.5}));

    let done = wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "SUCCEEDED");
    assert!(done, "job never succeeded; last state {}", project.state_of(&id));

    let job = project.get(&id);
    assert_eq!(job["result"], json!({"slept_seconds": 0.5}));
    assert!(job["state_reason"].is_null());

    // Evidence bundle: all core files plus a manifest carrying the state.
    let manifest = project.manifest(&id, "ping").expect("manifest missing");
    assert_eq!(manifest["state"], "SUCCEEDED");
    assert_eq!(manifest["job_id"], json!(id));
    for name in ["spec.json", "state.json", "result.json", "stdout.log", "stderr.log", "manifest.json"] {
        assert!(project.evidence_dir(&id).join(name).exists(), "missing {name}");
    }

    let listed: Vec<String> = manifest["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert!(listed.contains(&"spec.json".to_string()));
    assert!(!listed.iter().any(|n| n.ends_with("manifest.json")));
}

#[test]
fn submitted_spec_round_trips_byte_for_byte() {
    let mut project = Project::new();
    project.start_supervisor(1);

    let id = project.submit("ping", &json!({"sleep_seconds": 0.2}));
    wait_for(SPEC_WAIT_MAX_MS, || project.state_of(&id) == "SUCCEEDED");

    let spec_body = std::fs::read_to_string(project.evidence_dir(&id).join("spec.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&spec_body).unwrap();
    assert_eq!(parsed["job_type"], "ping");
    assert_eq!(parsed["params"], json!({"sleep_seconds": 0.2}));

    // Canonical: parse + re-serialize is the identity.
    assert_eq!(serde_json::to_string(&parsed).unwrap(), spec_body);
}

#[test]
fn unknown_job_type_is_rejected_at_submission() {
    let project = Project::new();
    assert!(project.submit_fails("warp", &json!({})));
}

#[test]
fn malformed_spec_is_rejected_at_submission() {
    let project = Project::new();
    assert!(project.submit_fails("ping", &json!({"sleep_seconds": -1})));
}

#[test]
fn submission_without_supervisor_stays_queued() {
    let project = Project::new();
    let id = project.submit("ping", &json!({"sleep_seconds": 0.1}));

    std::thread::sleep(std::time::Duration::from_millis(500));
    assert_eq!(project.state_of(&id), "QUEUED");
}
