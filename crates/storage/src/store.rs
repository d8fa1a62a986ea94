// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transactional job store.
//!
//! Every operation is one transaction: take the file lock, catch up on
//! entries other processes appended, validate against current state, append
//! exactly one event, apply it in memory. Validation happens only here —
//! replay applies recorded events unconditionally.

use crate::error::StoreError;
use crate::ledger::{Ledger, StoreLock};
use crate::state::ReplayState;
use gaffer_core::{
    Clock, Event, Job, JobId, JobSpec, JobState, StateReason, SystemClock, Worker, WorkerId,
};
use parking_lot::Mutex;
use std::path::Path;

/// Filters for [`JobStore::list`].
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub state: Option<JobState>,
    pub job_type: Option<String>,
}

struct Inner {
    ledger: Ledger,
    lock: StoreLock,
    state: ReplayState,
}

/// Handle to the on-disk store. Safe to open from multiple processes; writes
/// serialize through the ledger's exclusive lock.
pub struct JobStore<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    clock: C,
}

impl JobStore<SystemClock> {
    /// Open the store at `path` with the system clock.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> JobStore<C> {
    pub fn open_with_clock(path: &Path, clock: C) -> Result<Self, StoreError> {
        let ledger = Ledger::open(path)?;
        let lock = StoreLock::open(path)?;
        let store = Self {
            inner: Mutex::new(Inner { ledger, lock, state: ReplayState::default() }),
            clock,
        };
        store.refresh()?;
        Ok(store)
    }

    /// Catch up on entries appended by other processes (shared lock).
    fn refresh(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Inner { ledger, lock, state } = &mut *inner;
        let _guard = lock.shared()?;
        ledger.catch_up(|seq, event| state.apply(seq, event))
    }

    /// One write transaction. `build` validates against caught-up state and
    /// returns the event to append, or `None` for a validated no-op.
    fn write_txn(
        &self,
        build: impl FnOnce(&ReplayState, u64) -> Result<Option<Event>, StoreError>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Inner { ledger, lock, state } = &mut *inner;
        let _guard = lock.exclusive()?;
        ledger.catch_up(|seq, event| state.apply(seq, event))?;

        let now_ms = self.clock.epoch_ms();
        if let Some(event) = build(state, now_ms)? {
            let seq = ledger.append(&event)?;
            state.apply(seq, &event);
        }
        Ok(())
    }

    fn require_job(state: &ReplayState, id: &JobId) -> Result<Job, StoreError> {
        state.job(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn require_owned_running(
        state: &ReplayState,
        id: &JobId,
        worker_id: &WorkerId,
    ) -> Result<(), StoreError> {
        let job = Self::require_job(state, id)?;
        if job.state != JobState::Running {
            return Err(StoreError::NotRunning(*id));
        }
        if job.worker_id.as_ref() != Some(worker_id) {
            return Err(StoreError::OwnerMismatch(*id));
        }
        Ok(())
    }

    // ---- submission and queries ------------------------------------------

    /// Append a QUEUED row. Shape and job-type validation is the submission
    /// façade's responsibility; the store records whatever it is given.
    pub fn submit(&self, spec: JobSpec) -> Result<JobId, StoreError> {
        let id = JobId::generate();
        self.write_txn(|_, now_ms| Ok(Some(Event::JobSubmitted { id, spec, at_ms: now_ms })))?;
        Ok(id)
    }

    /// Read-only snapshot of one job.
    pub fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.refresh()?;
        let inner = self.inner.lock();
        Self::require_job(&inner.state, id)
    }

    /// Read-only enumeration, submission order.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Job>, StoreError> {
        self.refresh()?;
        let inner = self.inner.lock();
        let mut jobs: Vec<Job> = inner
            .state
            .jobs
            .values()
            .filter(|j| filter.state.is_none_or(|s| j.state == s))
            .filter(|j| {
                filter
                    .job_type
                    .as_deref()
                    .is_none_or(|t| j.spec.job_type == t)
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.seq);
        Ok(jobs)
    }

    /// Up to `limit` QUEUED jobs in submission order, excluding rows with a
    /// pending abort request. Read-only; claiming is a separate transition.
    pub fn fetch_next_queued(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.refresh()?;
        let inner = self.inner.lock();
        let mut jobs: Vec<Job> = inner
            .state
            .jobs
            .values()
            .filter(|j| j.state == JobState::Queued && !j.abort_requested)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.seq);
        jobs.truncate(limit);
        Ok(jobs)
    }

    /// All worker rows.
    pub fn workers(&self) -> Result<Vec<Worker>, StoreError> {
        self.refresh()?;
        let inner = self.inner.lock();
        let mut workers: Vec<Worker> = inner.state.workers.values().cloned().collect();
        workers.sort_by_key(|w| w.spawned_at_ms);
        Ok(workers)
    }

    // ---- worker-side transitions -----------------------------------------

    /// Atomically take ownership: QUEUED → RUNNING, stamp the first
    /// heartbeat. Rejects rows that are not QUEUED or already carry an abort
    /// request (those belong to the supervisor's abort sweep).
    pub fn claim(&self, id: &JobId, worker_id: &WorkerId, pid: u32) -> Result<(), StoreError> {
        let id = *id;
        let worker_id = *worker_id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Queued || job.abort_requested {
                return Err(StoreError::ClaimConflict(id));
            }
            Ok(Some(Event::JobClaimed { id, worker_id, pid, at_ms: now_ms }))
        })
    }

    /// Record liveness; optionally refresh the advisory phase/progress.
    pub fn heartbeat(
        &self,
        id: &JobId,
        worker_id: &WorkerId,
        phase: Option<String>,
        progress: Option<f64>,
    ) -> Result<(), StoreError> {
        let id = *id;
        let worker_id = *worker_id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Running || job.worker_id.as_ref() != Some(&worker_id) {
                return Err(StoreError::OwnerMismatch(id));
            }
            Ok(Some(Event::Heartbeat { id, worker_id, phase, progress, at_ms: now_ms }))
        })
    }

    /// RUNNING → SUCCEEDED with the handler's result summary.
    pub fn mark_succeeded(
        &self,
        id: &JobId,
        worker_id: &WorkerId,
        result: serde_json::Value,
    ) -> Result<(), StoreError> {
        let id = *id;
        let worker_id = *worker_id;
        self.write_txn(move |state, now_ms| {
            Self::require_owned_running(state, &id, &worker_id)?;
            Ok(Some(Event::JobSucceeded { id, worker_id, result, at_ms: now_ms }))
        })
    }

    /// RUNNING → FAILED.
    pub fn mark_failed(
        &self,
        id: &JobId,
        worker_id: &WorkerId,
        reason: StateReason,
        message: &str,
    ) -> Result<(), StoreError> {
        let id = *id;
        let worker_id = *worker_id;
        let message = message.to_string();
        self.write_txn(move |state, now_ms| {
            Self::require_owned_running(state, &id, &worker_id)?;
            Ok(Some(Event::JobFailed { id, worker_id, reason, message, at_ms: now_ms }))
        })
    }

    /// RUNNING → ABORTED, observed cooperatively by the owning worker.
    pub fn mark_aborted(
        &self,
        id: &JobId,
        worker_id: &WorkerId,
        reason: StateReason,
        result: serde_json::Value,
    ) -> Result<(), StoreError> {
        let id = *id;
        let worker_id = *worker_id;
        self.write_txn(move |state, now_ms| {
            Self::require_owned_running(state, &id, &worker_id)?;
            Ok(Some(Event::JobAborted { id, worker_id, reason, result, at_ms: now_ms }))
        })
    }

    // ---- out-of-band and supervisor transitions --------------------------

    /// Request cooperative termination. Idempotent; terminal rows no-op.
    pub fn request_abort(&self, id: &JobId) -> Result<(), StoreError> {
        let id = *id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.is_terminal() || job.abort_requested {
                return Ok(None);
            }
            Ok(Some(Event::AbortRequested { id, at_ms: now_ms }))
        })
    }

    /// RUNNING → ORPHANED; clears worker ownership.
    pub fn mark_orphaned(&self, id: &JobId, reason: StateReason) -> Result<(), StoreError> {
        let id = *id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Running {
                return Err(StoreError::NotRunning(id));
            }
            Ok(Some(Event::JobOrphaned { id, reason, at_ms: now_ms }))
        })
    }

    /// RUNNING → ABORTED after the cooperative deadline expired.
    pub fn escalate_abort(&self, id: &JobId) -> Result<(), StoreError> {
        let id = *id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Running {
                return Err(StoreError::NotRunning(id));
            }
            Ok(Some(Event::AbortEscalated { id, at_ms: now_ms }))
        })
    }

    /// QUEUED → ABORTED for rows aborted before any worker touched them.
    pub fn abort_before_run(&self, id: &JobId) -> Result<(), StoreError> {
        let id = *id;
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Queued {
                return Err(StoreError::NotQueued(id));
            }
            Ok(Some(Event::JobAbortedBeforeRun { id, at_ms: now_ms }))
        })
    }

    /// QUEUED → FAILED for pre-claim failures (unknown job type, spec
    /// rejected by the handler). No worker row is ever associated.
    pub fn fail_before_run(
        &self,
        id: &JobId,
        reason: StateReason,
        message: &str,
    ) -> Result<(), StoreError> {
        let id = *id;
        let message = message.to_string();
        self.write_txn(move |state, now_ms| {
            let job = Self::require_job(state, &id)?;
            if job.state != JobState::Queued {
                return Err(StoreError::NotQueued(id));
            }
            Ok(Some(Event::JobFailedBeforeRun { id, reason, message, at_ms: now_ms }))
        })
    }

    /// Record a freshly spawned child before it claims anything.
    pub fn record_spawned(&self, worker_id: &WorkerId, pid: u32) -> Result<(), StoreError> {
        let worker_id = *worker_id;
        self.write_txn(move |_, now_ms| {
            Ok(Some(Event::WorkerSpawned { worker_id, pid, at_ms: now_ms }))
        })
    }

    /// Worker row → EXITED on reap.
    pub fn mark_worker_exited(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        let worker_id = *worker_id;
        self.write_txn(move |state, now_ms| {
            match state.worker(&worker_id) {
                Some(w) if w.status != gaffer_core::WorkerStatus::Exited => {
                    Ok(Some(Event::WorkerExited { worker_id, at_ms: now_ms }))
                }
                _ => Ok(None),
            }
        })
    }

    /// Startup cleanup: every non-EXITED worker row → EXITED. The previous
    /// supervisor's children are no longer anyone's to reap.
    pub fn reset_workers(&self) -> Result<(), StoreError> {
        self.write_txn(|state, now_ms| {
            let any_live = state
                .workers
                .values()
                .any(|w| w.status != gaffer_core::WorkerStatus::Exited);
            if !any_live {
                return Ok(None);
            }
            Ok(Some(Event::WorkersReset { at_ms: now_ms }))
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
