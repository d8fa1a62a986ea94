// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from ledger replay.

use gaffer_core::{Event, Failure, Job, JobId, JobState, StateReason, Worker, WorkerId, WorkerStatus};
use std::collections::HashMap;

/// Job and worker rows derived by replaying the ledger.
///
/// # Idempotency requirement
///
/// `apply` handlers MUST be idempotent: applying the same event twice must
/// produce the same state as applying it once. Replay guards (existence
/// checks, terminal-state checks) exist for that reason — validation belongs
/// to the store operations, which run before an event is ever appended.
#[derive(Debug, Default, Clone)]
pub struct ReplayState {
    pub jobs: HashMap<JobId, Job>,
    pub workers: HashMap<WorkerId, Worker>,
}

impl ReplayState {
    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id.as_str())
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id.as_str())
    }

    /// Apply one ledger entry. `seq` is the entry's ledger sequence number.
    pub fn apply(&mut self, seq: u64, event: &Event) {
        match event {
            Event::JobSubmitted { id, spec, at_ms } => {
                self.jobs
                    .entry(*id)
                    .or_insert_with(|| Job::queued(*id, spec.clone(), seq, *at_ms));
            }

            Event::WorkerSpawned { worker_id, pid, at_ms } => {
                self.workers
                    .entry(*worker_id)
                    .or_insert_with(|| Worker::spawned(*worker_id, *pid, *at_ms));
            }

            Event::JobClaimed { id, worker_id, pid, at_ms } => {
                if let Some(job) = self.jobs.get_mut(id.as_str()) {
                    if job.state == JobState::Queued {
                        job.state = JobState::Running;
                        job.worker_id = Some(*worker_id);
                        job.worker_pid = Some(*pid);
                        job.claimed_at_ms = Some(*at_ms);
                        job.last_heartbeat_at_ms = Some(*at_ms);
                        job.touch(*at_ms);
                    }
                }
                if let Some(worker) = self.workers.get_mut(worker_id.as_str()) {
                    worker.status = WorkerStatus::Busy;
                    worker.job_id = Some(*id);
                    worker.pid = *pid;
                }
            }

            Event::Heartbeat { id, phase, progress, at_ms, .. } => {
                if let Some(job) = self.jobs.get_mut(id.as_str()) {
                    if job.state == JobState::Running {
                        job.last_heartbeat_at_ms = Some(*at_ms);
                        if phase.is_some() {
                            job.progress.phase.clone_from(phase);
                        }
                        if progress.is_some() {
                            job.progress.fraction = *progress;
                        }
                        job.touch(*at_ms);
                    }
                }
            }

            Event::AbortRequested { id, at_ms } => {
                if let Some(job) = self.jobs.get_mut(id.as_str()) {
                    if !job.abort_requested {
                        job.abort_requested = true;
                        job.abort_requested_at_ms = Some(*at_ms);
                        job.touch(*at_ms);
                    }
                }
            }

            Event::JobSucceeded { id, result, at_ms, .. } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Succeeded;
                    job.result = result.clone();
                });
            }

            Event::JobFailed { id, reason, message, at_ms, .. } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Failed;
                    job.state_reason = Some(*reason);
                    job.failure = Some(Failure {
                        code: reason.as_str().to_string(),
                        message: message.clone(),
                    });
                });
            }

            Event::JobAborted { id, reason, result, at_ms, .. } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Aborted;
                    job.state_reason = Some(*reason);
                    job.result = result.clone();
                });
            }

            Event::JobOrphaned { id, reason, at_ms } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Orphaned;
                    job.state_reason = Some(*reason);
                    job.worker_id = None;
                    job.worker_pid = None;
                });
            }

            Event::AbortEscalated { id, at_ms } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Aborted;
                    job.state_reason = Some(StateReason::AbortEscalated);
                    job.worker_id = None;
                    job.worker_pid = None;
                });
            }

            Event::JobAbortedBeforeRun { id, at_ms } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Aborted;
                    job.state_reason = Some(StateReason::AbortedBeforeRun);
                });
            }

            Event::JobFailedBeforeRun { id, reason, message, at_ms } => {
                self.finish_job(id, *at_ms, |job| {
                    job.state = JobState::Failed;
                    job.state_reason = Some(*reason);
                    job.failure = Some(Failure {
                        code: reason.as_str().to_string(),
                        message: message.clone(),
                    });
                });
            }

            Event::WorkerExited { worker_id, at_ms } => {
                if let Some(worker) = self.workers.get_mut(worker_id.as_str()) {
                    if worker.status != WorkerStatus::Exited {
                        worker.status = WorkerStatus::Exited;
                        worker.exited_at_ms = Some(*at_ms);
                        worker.job_id = None;
                    }
                }
            }

            Event::WorkersReset { at_ms } => {
                for worker in self.workers.values_mut() {
                    if worker.status != WorkerStatus::Exited {
                        worker.status = WorkerStatus::Exited;
                        worker.exited_at_ms = Some(*at_ms);
                        worker.job_id = None;
                    }
                }
            }
        }
    }

    /// Shared terminal-transition plumbing: guard immutability, stamp
    /// `finished_at_ms`, release the owning worker row.
    fn finish_job(&mut self, id: &JobId, at_ms: u64, f: impl FnOnce(&mut Job)) {
        let Some(job) = self.jobs.get_mut(id.as_str()) else {
            return;
        };
        if job.is_terminal() {
            return;
        }
        f(job);
        job.finished_at_ms = Some(at_ms);
        job.touch(at_ms);

        // A terminal job no longer holds its worker.
        for worker in self.workers.values_mut() {
            if worker.job_id.as_ref() == Some(id) {
                worker.job_id = None;
                worker.status = WorkerStatus::Idle;
            }
        }
    }
}
