// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger events.
//!
//! Every store transition is recorded as one event appended to the ledger;
//! state is derived by replay. Events are facts about what happened —
//! validation happens before append, never during replay, so a ledger always
//! replays to exactly one state.

use crate::job::{JobId, JobSpec, StateReason};
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// A single store transition.
///
/// `at_ms` is the wall-clock stamp taken under the write lock; replay derives
/// `updated_at_ms` from it monotonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new QUEUED job row.
    JobSubmitted {
        id: JobId,
        spec: JobSpec,
        at_ms: u64,
    },
    /// Supervisor spawned a child process for a prospective claim.
    WorkerSpawned {
        worker_id: WorkerId,
        pid: u32,
        at_ms: u64,
    },
    /// Worker took ownership: QUEUED → RUNNING plus worker row BUSY.
    JobClaimed {
        id: JobId,
        worker_id: WorkerId,
        pid: u32,
        at_ms: u64,
    },
    /// Liveness refresh; phase/progress update only when present.
    Heartbeat {
        id: JobId,
        worker_id: WorkerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        at_ms: u64,
    },
    /// Out-of-band cooperative termination request.
    AbortRequested { id: JobId, at_ms: u64 },
    /// RUNNING → SUCCEEDED with the handler's result summary.
    JobSucceeded {
        id: JobId,
        worker_id: WorkerId,
        result: serde_json::Value,
        at_ms: u64,
    },
    /// RUNNING → FAILED.
    JobFailed {
        id: JobId,
        worker_id: WorkerId,
        reason: StateReason,
        message: String,
        at_ms: u64,
    },
    /// RUNNING → ABORTED, cooperatively observed by the worker.
    ///
    /// Carries the handler's partial result so evidence can show what the
    /// handler reported at the abort point (by convention `{"aborted": true}`).
    JobAborted {
        id: JobId,
        worker_id: WorkerId,
        reason: StateReason,
        #[serde(default)]
        result: serde_json::Value,
        at_ms: u64,
    },
    /// RUNNING → ORPHANED; supervisor-only, clears ownership.
    JobOrphaned {
        id: JobId,
        reason: StateReason,
        at_ms: u64,
    },
    /// RUNNING → ABORTED after the cooperative deadline; supervisor-only.
    AbortEscalated { id: JobId, at_ms: u64 },
    /// QUEUED → ABORTED before any worker touched the row.
    JobAbortedBeforeRun { id: JobId, at_ms: u64 },
    /// QUEUED → FAILED for pre-claim failures (unknown type, malformed spec).
    JobFailedBeforeRun {
        id: JobId,
        reason: StateReason,
        message: String,
        at_ms: u64,
    },
    /// Worker process reaped.
    WorkerExited { worker_id: WorkerId, at_ms: u64 },
    /// Startup cleanup: every non-EXITED worker row → EXITED.
    WorkersReset { at_ms: u64 },
}

impl Event {
    /// The job this event touches, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobSubmitted { id, .. }
            | Event::JobClaimed { id, .. }
            | Event::Heartbeat { id, .. }
            | Event::AbortRequested { id, .. }
            | Event::JobSucceeded { id, .. }
            | Event::JobFailed { id, .. }
            | Event::JobAborted { id, .. }
            | Event::JobOrphaned { id, .. }
            | Event::AbortEscalated { id, .. }
            | Event::JobAbortedBeforeRun { id, .. }
            | Event::JobFailedBeforeRun { id, .. } => Some(id),
            Event::WorkerSpawned { .. }
            | Event::WorkerExited { .. }
            | Event::WorkersReset { .. } => None,
        }
    }

    /// The wall-clock stamp carried by the event.
    pub fn at_ms(&self) -> u64 {
        match self {
            Event::JobSubmitted { at_ms, .. }
            | Event::WorkerSpawned { at_ms, .. }
            | Event::JobClaimed { at_ms, .. }
            | Event::Heartbeat { at_ms, .. }
            | Event::AbortRequested { at_ms, .. }
            | Event::JobSucceeded { at_ms, .. }
            | Event::JobFailed { at_ms, .. }
            | Event::JobAborted { at_ms, .. }
            | Event::JobOrphaned { at_ms, .. }
            | Event::AbortEscalated { at_ms, .. }
            | Event::JobAbortedBeforeRun { at_ms, .. }
            | Event::JobFailedBeforeRun { at_ms, .. }
            | Event::WorkerExited { at_ms, .. }
            | Event::WorkersReset { at_ms } => *at_ms,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
