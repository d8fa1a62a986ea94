// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor loop.
//!
//! Each tick runs five phases in a fixed order: sweep aborted QUEUED rows,
//! spawn workers up to the concurrency bound, reap exited children, orphan
//! heartbeat-stale rows, and escalate aborts past the cooperative deadline.
//! A failed phase is logged and the tick carries on; the loop never dies on
//! a single bad operation.

use crate::config::Config;
use crate::decision;
use crate::error::SupervisorError;
use crate::spawn::ProcessSpawner;
use crate::termination;
use gaffer_core::{Clock, JobId, JobState, StateReason, SystemClock, WorkerId};
use gaffer_evidence::EvidenceWriter;
use gaffer_handlers::HandlerRegistry;
use gaffer_storage::{JobStore, ListFilter, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Child;
use tracing::{debug, info, warn};

struct ActiveWorker {
    child: Child,
    job_id: JobId,
    pid: u32,
}

/// The long-running coordinator. Owns the worker-id → child-handle table;
/// everything else lives in the store.
pub struct Supervisor<Sp: ProcessSpawner, C: Clock = SystemClock> {
    config: Config,
    store: Arc<JobStore<C>>,
    registry: Arc<HandlerRegistry>,
    evidence: EvidenceWriter,
    spawner: Sp,
    clock: C,
    active: HashMap<WorkerId, ActiveWorker>,
}

impl<Sp: ProcessSpawner, C: Clock> Supervisor<Sp, C> {
    pub fn new(
        config: Config,
        store: Arc<JobStore<C>>,
        registry: Arc<HandlerRegistry>,
        spawner: Sp,
        clock: C,
    ) -> Self {
        let evidence = EvidenceWriter::new(config.outputs_root.clone());
        Self {
            config,
            store,
            registry,
            evidence,
            spawner,
            clock,
            active: HashMap::new(),
        }
    }

    /// Restart recovery: worker rows are rebuilt from scratch, RUNNING rows
    /// stand or fall by their own heartbeats on subsequent orphan scans.
    pub fn startup(&self) -> Result<(), SupervisorError> {
        self.store.reset_workers()?;

        let queued = self.store.list(&ListFilter { state: Some(JobState::Queued), job_type: None })?;
        let running = self.store.list(&ListFilter { state: Some(JobState::Running), job_type: None })?;
        info!(
            queued = queued.len(),
            running = running.len(),
            max_workers = self.config.max_workers,
            "supervisor started"
        );
        if !running.is_empty() {
            info!(
                count = running.len(),
                "found RUNNING rows from a previous run; the orphan scan will settle them"
            );
        }
        Ok(())
    }

    /// Run ticks forever. Cancel the future to stop; children are left
    /// running and a restarted supervisor picks the world up from the store.
    pub async fn run(&mut self) -> Result<(), SupervisorError> {
        self.startup()?;
        let mut interval = tokio::time::interval(self.config.tick_period());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One tick: all phases, each failure contained.
    pub async fn tick(&mut self) {
        if let Err(e) = self.phase_abort_queued() {
            warn!(error = %e, "abort-queued sweep failed");
        }
        if let Err(e) = self.phase_spawn() {
            warn!(error = %e, "spawn phase failed");
        }
        if let Err(e) = self.phase_reap() {
            warn!(error = %e, "reap phase failed");
        }
        if let Err(e) = self.phase_orphan_scan().await {
            warn!(error = %e, "orphan scan failed");
        }
        if let Err(e) = self.phase_abort_escalation().await {
            warn!(error = %e, "abort escalation failed");
        }
    }

    /// Number of children currently tracked.
    pub fn active_workers(&self) -> usize {
        self.active.len()
    }

    // ---- phase 1: abort-before-run ---------------------------------------

    fn phase_abort_queued(&mut self) -> Result<(), SupervisorError> {
        let queued = self
            .store
            .list(&ListFilter { state: Some(JobState::Queued), job_type: None })?;
        for id in decision::aborted_while_queued(&queued) {
            match self.store.abort_before_run(&id) {
                Ok(()) => {
                    info!(job_id = %id, "aborted before run");
                    self.write_evidence(&id);
                }
                Err(e) if e.is_contention() => {
                    debug!(job_id = %id, error = %e, "abort-before-run lost a race")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // ---- phase 2: spawn --------------------------------------------------

    fn phase_spawn(&mut self) -> Result<(), SupervisorError> {
        let free = self.config.max_workers.saturating_sub(self.active.len());
        if free == 0 {
            return Ok(());
        }

        for job in self.store.fetch_next_queued(free)? {
            // A row can still read QUEUED while last tick's child is between
            // spawn and claim; don't race our own worker.
            if self.active.values().any(|a| a.job_id == job.id) {
                continue;
            }
            let worker_id = WorkerId::generate();

            if let Some(handler) = self.registry.resolve(&job.spec.job_type) {
                if let Some(hint) = handler.estimate_cost(&job.spec.params) {
                    debug!(job_id = %job.id, hint, "spawning with cost hint");
                }
            }

            // Order matters: allocate id, spawn, let the child claim. On a
            // claim conflict the child exits cleanly and the row stays with
            // whoever won.
            let child = match self.spawner.spawn(&job.id, &worker_id) {
                Ok(child) => child,
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "spawn failed; job stays queued");
                    continue;
                }
            };
            let pid = child.id().unwrap_or(0);
            self.store.record_spawned(&worker_id, pid)?;
            info!(job_id = %job.id, worker_id = %worker_id, pid, "worker spawned");
            self.active
                .insert(worker_id, ActiveWorker { child, job_id: job.id, pid });
        }
        Ok(())
    }

    // ---- phase 3: reap ---------------------------------------------------

    fn phase_reap(&mut self) -> Result<(), SupervisorError> {
        let mut exited: Vec<(WorkerId, Option<i32>)> = Vec::new();
        for (worker_id, active) in self.active.iter_mut() {
            match active.child.try_wait() {
                Ok(Some(status)) => exited.push((*worker_id, status.code())),
                Ok(None) => {}
                Err(e) => {
                    warn!(worker_id = %worker_id, error = %e, "child poll failed");
                }
            }
        }

        for (worker_id, code) in exited {
            let Some(active) = self.active.remove(&worker_id) else {
                continue;
            };
            debug!(worker_id = %worker_id, code, "worker exited");
            self.store.mark_worker_exited(&worker_id)?;

            // A row still RUNNING under this worker means the child died
            // between claiming and recording a terminal state.
            let job = match self.store.get(&active.job_id) {
                Ok(job) => job,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            if job.state == JobState::Running && job.worker_id == Some(worker_id) {
                warn!(
                    job_id = %job.id,
                    worker_id = %worker_id,
                    code,
                    "worker died without a terminal state"
                );
                let message = match code {
                    Some(code) => format!("worker exited with status {code}"),
                    None => "worker killed by signal".to_string(),
                };
                match self
                    .store
                    .mark_failed(&job.id, &worker_id, StateReason::WorkerCrashed, &message)
                {
                    Ok(()) => self.write_evidence(&job.id),
                    Err(e) if e.is_contention() => {
                        debug!(job_id = %job.id, error = %e, "crash mark lost a race")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    // ---- phase 4: orphan scan --------------------------------------------

    async fn phase_orphan_scan(&mut self) -> Result<(), SupervisorError> {
        let running = self
            .store
            .list(&ListFilter { state: Some(JobState::Running), job_type: None })?;
        let now_ms = self.clock.epoch_ms();
        for id in decision::stale_running(&running, now_ms, self.config.heartbeat_timeout()) {
            let pid = running.iter().find(|j| j.id == id).and_then(|j| j.worker_pid);
            self.terminate_and_mark(&id, pid, TerminalKind::Orphaned).await?;
        }
        Ok(())
    }

    // ---- phase 5: abort escalation ---------------------------------------

    async fn phase_abort_escalation(&mut self) -> Result<(), SupervisorError> {
        let running = self
            .store
            .list(&ListFilter { state: Some(JobState::Running), job_type: None })?;
        let now_ms = self.clock.epoch_ms();
        for id in decision::escalation_due(&running, now_ms, self.config.abort_escalation()) {
            let pid = running.iter().find(|j| j.id == id).and_then(|j| j.worker_pid);
            self.terminate_and_mark(&id, pid, TerminalKind::AbortEscalated).await?;
        }
        Ok(())
    }

    // ---- shared termination path -----------------------------------------

    async fn terminate_and_mark(
        &mut self,
        id: &JobId,
        pid: Option<u32>,
        kind: TerminalKind,
    ) -> Result<(), SupervisorError> {
        if let Some(pid) = pid {
            let outcome = termination::terminate(pid, self.config.graceful_termination()).await;
            info!(job_id = %id, pid, ?outcome, "terminated worker process");
        }

        let result = match kind {
            TerminalKind::Orphaned => {
                self.store.mark_orphaned(id, StateReason::HeartbeatTimeout)
            }
            TerminalKind::AbortEscalated => self.store.escalate_abort(id),
        };
        match result {
            Ok(()) => {
                info!(job_id = %id, kind = ?kind, "job terminated by supervisor");
                self.write_evidence(id);
            }
            Err(e) if e.is_contention() => {
                debug!(job_id = %id, error = %e, "terminal mark lost a race");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        // Forget the child handle if it was ours; the exit status of a
        // process we just killed carries no further information.
        let stale: Vec<WorkerId> = self
            .active
            .iter()
            .filter(|(_, a)| a.job_id == *id)
            .map(|(w, _)| *w)
            .collect();
        for worker_id in stale {
            if let Some(mut active) = self.active.remove(&worker_id) {
                let _ = active.child.try_wait();
                self.store.mark_worker_exited(&worker_id)?;
            }
        }
        Ok(())
    }

    /// Evidence for supervisor-performed terminals; written on behalf of the
    /// worker that is no longer around to do it. Failures are logged — the
    /// store transition already happened and must not be rolled back.
    fn write_evidence(&self, id: &JobId) {
        match self.store.get(id) {
            Ok(job) => {
                if let Err(e) = self.evidence.write_bundle(&job) {
                    warn!(job_id = %id, error = %e, "evidence write failed");
                }
            }
            Err(e) => warn!(job_id = %id, error = %e, "evidence snapshot failed"),
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_active_for_test(&mut self, worker_id: WorkerId, child: Child, job_id: JobId) {
        let pid = child.id().unwrap_or(0);
        self.active.insert(worker_id, ActiveWorker { child, job_id, pid });
    }
}

#[derive(Debug, Clone, Copy)]
enum TerminalKind {
    Orphaned,
    AbortEscalated,
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
