// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context handed to handlers.

use gaffer_storage::JobStore;
use gaffer_core::{JobId, WorkerId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capabilities a running handler may use.
///
/// All store effects are mediated here; heartbeat and progress writes are
/// best-effort and never interrupt the handler (an abandoned worker finds out
/// it lost ownership when it tries to record its terminal state).
pub struct JobContext {
    store: Arc<JobStore>,
    job_id: JobId,
    worker_id: WorkerId,
    evidence_dir: PathBuf,
    abort_observed: AtomicBool,
}

impl JobContext {
    pub fn new(
        store: Arc<JobStore>,
        job_id: JobId,
        worker_id: WorkerId,
        evidence_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            job_id,
            worker_id,
            evidence_dir,
            abort_observed: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Filesystem path owned by this job, below the outputs root.
    pub fn evidence_dir(&self) -> &Path {
        &self.evidence_dir
    }

    /// Record liveness, optionally refreshing the phase label.
    ///
    /// The bootstrap drives this on a timer; handlers may also call it from
    /// long CPU sections.
    pub fn heartbeat(&self, phase: Option<&str>) {
        if let Err(e) = self.store.heartbeat(
            &self.job_id,
            &self.worker_id,
            phase.map(str::to_string),
            None,
        ) {
            tracing::debug!(job_id = %self.job_id, error = %e, "heartbeat not recorded");
        }
    }

    /// Advisory progress update.
    pub fn report_progress(&self, fraction: f64, phase: &str) {
        if let Err(e) = self.store.heartbeat(
            &self.job_id,
            &self.worker_id,
            Some(phase.to_string()),
            Some(fraction.clamp(0.0, 1.0)),
        ) {
            tracing::debug!(job_id = %self.job_id, error = %e, "progress not recorded");
        }
    }

    /// Consult the store for a pending abort request.
    ///
    /// Latches: once observed, [`JobContext::abort_observed`] stays true so
    /// the bootstrap can distinguish a cooperative abort return from a result
    /// that merely happens to carry an `aborted` field.
    pub fn is_abort_requested(&self) -> bool {
        let requested = self
            .store
            .get(&self.job_id)
            .map(|job| job.abort_requested)
            .unwrap_or(false);
        if requested {
            self.abort_observed.store(true, Ordering::Relaxed);
        }
        requested
    }

    /// Whether an abort request was ever observed through this context.
    pub fn abort_observed(&self) -> bool {
        self.abort_observed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
