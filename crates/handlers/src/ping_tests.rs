// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::JobContext;
use crate::handler::Handler;
use gaffer_core::{JobId, JobSpec, WorkerId};
use gaffer_storage::JobStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

#[yare::parameterized(
    empty          = { json!({}) },
    zero           = { json!({"sleep_seconds": 0}) },
    fractional     = { json!({"sleep_seconds": 0.25}) },
    with_flag      = { json!({"sleep_seconds": 1, "ignore_abort": true}) },
    extra_keys     = { json!({"sleep_seconds": 1, "note": "kept"}) },
)]
fn validate_accepts(params: serde_json::Value) {
    assert!(PingHandler.validate(&params).is_ok());
}

#[yare::parameterized(
    not_object     = { json!(42) },
    negative       = { json!({"sleep_seconds": -1.0}) },
    non_numeric    = { json!({"sleep_seconds": "soon"}) },
    bad_flag       = { json!({"sleep_seconds": 1, "ignore_abort": "yes"}) },
)]
fn validate_rejects(params: serde_json::Value) {
    assert!(PingHandler.validate(&params).is_err());
}

/// Set up a claimed job so the context has real ownership.
fn claimed_context(dir: &tempfile::TempDir, params: serde_json::Value) -> (Arc<JobStore>, JobContext) {
    let store = Arc::new(JobStore::open(&dir.path().join("store.ledger")).unwrap());
    let job_id = store.submit(JobSpec::new("ping", params)).unwrap();
    let worker_id = WorkerId::from_string("wkr-test");
    store.claim(&job_id, &worker_id, 1).unwrap();
    let ctx = JobContext::new(
        store.clone(),
        job_id,
        worker_id,
        dir.path().join("evidence"),
    );
    (store, ctx)
}

#[test]
fn execute_reports_slept_seconds() {
    let dir = tempdir().unwrap();
    let params = json!({"sleep_seconds": 0.1});
    let (_store, ctx) = claimed_context(&dir, params.clone());

    let result = PingHandler.execute(&params, &ctx).unwrap();
    assert_eq!(result, json!({"slept_seconds": 0.1}));
    assert!(!ctx.abort_observed());
}

#[test]
fn execute_returns_aborted_on_cooperative_abort() {
    let dir = tempdir().unwrap();
    let params = json!({"sleep_seconds": 30.0});
    let (store, ctx) = claimed_context(&dir, params.clone());

    store.request_abort(ctx.job_id()).unwrap();

    let result = PingHandler.execute(&params, &ctx).unwrap();
    assert_eq!(result["aborted"], json!(true));
    assert!(ctx.abort_observed());
}

#[test]
fn execute_ignores_abort_when_told_to() {
    let dir = tempdir().unwrap();
    let params = json!({"sleep_seconds": 0.1, "ignore_abort": true});
    let (store, ctx) = claimed_context(&dir, params.clone());

    store.request_abort(ctx.job_id()).unwrap();

    let result = PingHandler.execute(&params, &ctx).unwrap();
    assert_eq!(result, json!({"slept_seconds": 0.1}));
    assert!(!ctx.abort_observed());
}

#[test]
fn cost_hint_mentions_sleep() {
    let hint = PingHandler
        .estimate_cost(&json!({"sleep_seconds": 2.0}))
        .unwrap();
    assert_eq!(hint, "2s sleep");
}

#[test]
fn unknown_job_never_aborts() {
    // A context whose job row is gone reports no abort rather than erroring.
    let dir = tempdir().unwrap();
    let store = Arc::new(JobStore::open(&dir.path().join("store.ledger")).unwrap());
    let ctx = JobContext::new(
        store,
        JobId::from_string("job-gone"),
        WorkerId::from_string("wkr-test"),
        dir.path().join("evidence"),
    );
    assert!(!ctx.is_abort_requested());
}
