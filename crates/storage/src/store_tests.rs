// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gaffer_core::{FakeClock, WorkerStatus};
use serde_json::json;
use tempfile::tempdir;

fn ping_spec(sleep: f64) -> JobSpec {
    JobSpec::new("ping", json!({"sleep_seconds": sleep}))
}

fn open_store(dir: &tempfile::TempDir) -> JobStore {
    JobStore::open(&dir.path().join("store.ledger")).unwrap()
}

fn wkr(n: u32) -> WorkerId {
    WorkerId::from_string(format!("wkr-{n}"))
}

#[test]
fn submit_then_get_round_trips_spec() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let spec = ping_spec(1.0).with_metadata(json!({"submitter": "test"}));
    let id = store.submit(spec.clone()).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.spec, spec);
    assert_eq!(job.state, JobState::Queued);
    assert!(job.last_heartbeat_at_ms.is_none());
}

#[test]
fn get_unknown_job_is_not_found() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let missing = JobId::from_string("job-missing");
    assert!(matches!(store.get(&missing), Err(StoreError::NotFound(_))));
}

#[test]
fn fetch_next_queued_is_fifo_with_budget() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let a = store.submit(ping_spec(0.1)).unwrap();
    let b = store.submit(ping_spec(0.2)).unwrap();
    let c = store.submit(ping_spec(0.3)).unwrap();

    let next = store.fetch_next_queued(2).unwrap();
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].id, a);
    assert_eq!(next[1].id, b);

    let all = store.fetch_next_queued(10).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].id, c);
}

#[test]
fn fetch_next_queued_excludes_abort_requested() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let a = store.submit(ping_spec(0.1)).unwrap();
    let b = store.submit(ping_spec(0.2)).unwrap();
    store.request_abort(&a).unwrap();

    let next = store.fetch_next_queued(10).unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, b);
}

#[test]
fn claim_transitions_and_stamps_heartbeat() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(0.1)).unwrap();
    store.record_spawned(&wkr(1), 4242).unwrap();
    store.claim(&id, &wkr(1), 4242).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.worker_id, Some(wkr(1)));
    assert_eq!(job.worker_pid, Some(4242));
    assert!(job.claimed_at_ms.is_some());
    assert!(job.last_heartbeat_at_ms.is_some());

    let workers = store.workers().unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].status, WorkerStatus::Busy);
    assert_eq!(workers[0].job_id, Some(id));
}

#[test]
fn double_claim_conflicts() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(0.1)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();

    let err = store.claim(&id, &wkr(2), 2).unwrap_err();
    assert!(matches!(err, StoreError::ClaimConflict(_)));

    // The original owner is untouched.
    let job = store.get(&id).unwrap();
    assert_eq!(job.worker_id, Some(wkr(1)));
}

#[test]
fn claim_rejects_abort_requested_row() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(0.1)).unwrap();
    store.request_abort(&id).unwrap();

    let err = store.claim(&id, &wkr(1), 1).unwrap_err();
    assert!(matches!(err, StoreError::ClaimConflict(_)));
}

#[test]
fn heartbeat_requires_ownership() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(0.1)).unwrap();

    // Not running yet.
    let err = store.heartbeat(&id, &wkr(1), None, None).unwrap_err();
    assert!(matches!(err, StoreError::OwnerMismatch(_)));

    store.claim(&id, &wkr(1), 1).unwrap();
    store.heartbeat(&id, &wkr(1), None, None).unwrap();

    // Wrong worker.
    let err = store.heartbeat(&id, &wkr(2), None, None).unwrap_err();
    assert!(matches!(err, StoreError::OwnerMismatch(_)));
}

#[test]
fn heartbeat_updates_phase_and_progress() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(0.1)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();

    store
        .heartbeat(&id, &wkr(1), Some("sleeping".to_string()), Some(0.5))
        .unwrap();
    let job = store.get(&id).unwrap();
    assert_eq!(job.progress.phase.as_deref(), Some("sleeping"));
    assert_eq!(job.progress.fraction, Some(0.5));

    // A bare heartbeat keeps the previous phase.
    store.heartbeat(&id, &wkr(1), None, None).unwrap();
    let job = store.get(&id).unwrap();
    assert_eq!(job.progress.phase.as_deref(), Some("sleeping"));
}

#[test]
fn mark_succeeded_records_result() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(1.0)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();
    store
        .mark_succeeded(&id, &wkr(1), json!({"slept_seconds": 1.0}))
        .unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert_eq!(job.result, json!({"slept_seconds": 1.0}));
    assert!(job.finished_at_ms.is_some());
    assert!(job.state_reason.is_none());
}

#[test]
fn mark_failed_records_reason_and_failure() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(1.0)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();
    store
        .mark_failed(&id, &wkr(1), StateReason::HandlerRaised, "boom")
        .unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.state_reason, Some(StateReason::HandlerRaised));
    let failure = job.failure.unwrap();
    assert_eq!(failure.code, "handler_raised");
    assert_eq!(failure.message, "boom");
}

#[test]
fn mark_aborted_records_cooperative_result() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(30.0)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();
    store.request_abort(&id).unwrap();
    store
        .mark_aborted(&id, &wkr(1), StateReason::UserAbort, json!({"aborted": true}))
        .unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Aborted);
    assert_eq!(job.state_reason, Some(StateReason::UserAbort));
    assert_eq!(job.result, json!({"aborted": true}));
}

#[test]
fn terminal_rows_are_immutable() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(1.0)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();
    store.mark_succeeded(&id, &wkr(1), json!({})).unwrap();
    let snapshot = store.get(&id).unwrap();

    let err = store
        .mark_failed(&id, &wkr(1), StateReason::HandlerRaised, "late")
        .unwrap_err();
    assert!(matches!(err, StoreError::NotRunning(_)));

    let err = store.mark_orphaned(&id, StateReason::HeartbeatTimeout).unwrap_err();
    assert!(matches!(err, StoreError::NotRunning(_)));

    // Abort on a terminal row is a silent no-op.
    store.request_abort(&id).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, snapshot.state);
    assert_eq!(job.updated_at_ms, snapshot.updated_at_ms);
    assert!(!job.abort_requested);
}

#[test]
fn request_abort_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(30.0)).unwrap();
    store.request_abort(&id).unwrap();
    let first = store.get(&id).unwrap();

    store.request_abort(&id).unwrap();
    store.request_abort(&id).unwrap();

    let job = store.get(&id).unwrap();
    assert!(job.abort_requested);
    assert_eq!(job.abort_requested_at_ms, first.abort_requested_at_ms);
    assert_eq!(job.updated_at_ms, first.updated_at_ms);
}

#[test]
fn abort_before_run_requires_queued() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(1.0)).unwrap();
    store.request_abort(&id).unwrap();
    store.abort_before_run(&id).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Aborted);
    assert_eq!(job.state_reason, Some(StateReason::AbortedBeforeRun));
    assert!(job.worker_id.is_none());

    let err = store.abort_before_run(&id).unwrap_err();
    assert!(matches!(err, StoreError::NotQueued(_)));
}

#[test]
fn fail_before_run_records_reason_without_claim() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store
        .submit(JobSpec::new("no-such-type", json!({})))
        .unwrap();
    store
        .fail_before_run(&id, StateReason::UnknownJobType, "no handler registered")
        .unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.state_reason, Some(StateReason::UnknownJobType));
    assert!(job.worker_id.is_none());
    assert!(job.claimed_at_ms.is_none());
    assert!(store.workers().unwrap().is_empty());
}

#[test]
fn mark_orphaned_clears_ownership() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(60.0)).unwrap();
    store.record_spawned(&wkr(1), 7).unwrap();
    store.claim(&id, &wkr(1), 7).unwrap();
    store.mark_orphaned(&id, StateReason::HeartbeatTimeout).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Orphaned);
    assert_eq!(job.state_reason, Some(StateReason::HeartbeatTimeout));
    assert!(job.worker_id.is_none());
    assert!(job.worker_pid.is_none());

    // The worker row no longer references the job.
    let workers = store.workers().unwrap();
    assert!(workers[0].job_id.is_none());
}

#[test]
fn escalate_abort_reaches_aborted() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let id = store.submit(ping_spec(60.0)).unwrap();
    store.claim(&id, &wkr(1), 7).unwrap();
    store.request_abort(&id).unwrap();
    store.escalate_abort(&id).unwrap();

    let job = store.get(&id).unwrap();
    assert_eq!(job.state, JobState::Aborted);
    assert_eq!(job.state_reason, Some(StateReason::AbortEscalated));
    assert!(job.worker_id.is_none());
}

#[test]
fn reset_workers_exits_all_live_rows() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    store.record_spawned(&wkr(1), 1).unwrap();
    store.record_spawned(&wkr(2), 2).unwrap();
    let id = store.submit(ping_spec(1.0)).unwrap();
    store.claim(&id, &wkr(1), 1).unwrap();

    store.reset_workers().unwrap();

    for worker in store.workers().unwrap() {
        assert_eq!(worker.status, WorkerStatus::Exited);
        assert!(worker.job_id.is_none());
        assert!(worker.exited_at_ms.is_some());
    }

    // Idempotent: a second reset appends nothing and changes nothing.
    store.reset_workers().unwrap();
}

#[test]
fn list_filters_by_state_and_type() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir);

    let a = store.submit(ping_spec(0.1)).unwrap();
    let _b = store.submit(JobSpec::new("other", json!({}))).unwrap();
    store.claim(&a, &wkr(1), 1).unwrap();

    let running = store
        .list(&ListFilter { state: Some(JobState::Running), job_type: None })
        .unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, a);

    let others = store
        .list(&ListFilter { state: None, job_type: Some("other".to_string()) })
        .unwrap();
    assert_eq!(others.len(), 1);

    let all = store.list(&ListFilter::default()).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn updated_at_is_monotonic_under_clock_retreat() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(10_000);
    let store =
        JobStore::open_with_clock(&dir.path().join("store.ledger"), clock.clone()).unwrap();

    let id = store.submit(ping_spec(0.1)).unwrap();
    let t0 = store.get(&id).unwrap().updated_at_ms;

    // Clock goes backwards; the stamp must still advance.
    clock.set_epoch_ms(9_000);
    store.request_abort(&id).unwrap();
    let t1 = store.get(&id).unwrap().updated_at_ms;
    assert!(t1 > t0);
}

#[test]
fn second_handle_observes_transitions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.ledger");
    let supervisor = JobStore::open(&path).unwrap();
    let worker = JobStore::open(&path).unwrap();

    let id = supervisor.submit(ping_spec(0.1)).unwrap();

    // The worker handle claims through its own file handle.
    worker.claim(&id, &wkr(1), 99).unwrap();

    // The supervisor handle sees the claim after catch-up.
    let job = supervisor.get(&id).unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.worker_pid, Some(99));

    // And a conflicting claim through the supervisor handle is rejected.
    let err = supervisor.claim(&id, &wkr(2), 100).unwrap_err();
    assert!(matches!(err, StoreError::ClaimConflict(_)));
}

#[test]
fn contention_classifier() {
    let id = JobId::from_string("job-x");
    assert!(StoreError::ClaimConflict(id).is_contention());
    assert!(StoreError::OwnerMismatch(id).is_contention());
    assert!(StoreError::NotRunning(id).is_contention());
    assert!(StoreError::NotQueued(id).is_contention());
    assert!(!StoreError::NotFound(id).is_contention());
}
