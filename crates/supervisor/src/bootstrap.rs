// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker bootstrap: the entry routine of each child process.
//!
//! Invoked with one job identifier. Resolves the handler, validates, claims,
//! heartbeats on a timer, executes, records the terminal state, writes
//! evidence, and exits with the contract code. No failure escapes as a
//! panic; everything becomes a `(state, reason, message)` in the store.

use crate::error::SupervisorError;
use crate::heartbeat::HeartbeatThread;
use gaffer_core::{JobId, StateReason, WorkerId};
use gaffer_evidence::EvidenceWriter;
use gaffer_handlers::{HandlerRegistry, JobContext};
use gaffer_storage::{JobStore, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Exit code for unexpected bootstrap crashes; the supervisor reclassifies
/// the job as FAILED (`worker_crashed`) on reap.
pub const EXIT_BOOTSTRAP_CRASH: i32 = 64;

/// How a bootstrap run ended. Maps onto the worker exit-code contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Terminal SUCCEEDED, evidence complete.
    Succeeded,
    /// Handler raised; terminal FAILED, evidence complete.
    HandlerFailed,
    /// Unknown job type or malformed spec; terminal FAILED, evidence complete.
    Rejected,
    /// Cooperative abort observed; terminal ABORTED, evidence complete.
    Aborted,
    /// Another claimant or the supervisor owns the row; exited with no side
    /// effects.
    LostClaim,
}

impl BootstrapOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapOutcome::Succeeded | BootstrapOutcome::LostClaim => 0,
            BootstrapOutcome::HandlerFailed => 1,
            BootstrapOutcome::Rejected => 2,
            BootstrapOutcome::Aborted => 3,
        }
    }
}

pub struct BootstrapOptions {
    pub store_path: PathBuf,
    pub outputs_root: PathBuf,
    pub heartbeat_period: Duration,
    /// Redirect this process's stdout/stderr into the evidence log files.
    /// True in real workers; off for in-process tests.
    pub redirect_stdio: bool,
}

/// Run one job to a terminal state. Errors returned here are infrastructure
/// failures (store unreachable, evidence unwritable); the caller exits with
/// [`EXIT_BOOTSTRAP_CRASH`] and the supervisor settles the row.
pub fn run(
    job_id: &JobId,
    worker_id: &WorkerId,
    registry: &HandlerRegistry,
    opts: &BootstrapOptions,
) -> Result<BootstrapOutcome, SupervisorError> {
    let store = Arc::new(JobStore::open(&opts.store_path)?);
    let evidence = EvidenceWriter::new(opts.outputs_root.clone());
    let job = store.get(job_id)?;

    // Unknown type and malformed specs terminate QUEUED → FAILED without a
    // claim; no worker row ever references the job.
    let Some(handler) = registry.resolve(&job.spec.job_type) else {
        warn!(job_id = %job_id, job_type = %job.spec.job_type, "unknown job type");
        return match store.fail_before_run(
            job_id,
            StateReason::UnknownJobType,
            &format!("no handler registered for {:?}", job.spec.job_type),
        ) {
            Ok(()) => {
                evidence.write_bundle(&store.get(job_id)?)?;
                Ok(BootstrapOutcome::Rejected)
            }
            Err(e) if e.is_contention() => Ok(BootstrapOutcome::LostClaim),
            Err(e) => Err(e.into()),
        };
    };

    if let Err(reason) = handler.validate(&job.spec.params) {
        warn!(job_id = %job_id, error = %reason, "spec rejected by handler");
        return match store.fail_before_run(job_id, StateReason::MalformedSpec, &reason.0) {
            Ok(()) => {
                evidence.write_bundle(&store.get(job_id)?)?;
                Ok(BootstrapOutcome::Rejected)
            }
            Err(e) if e.is_contention() => Ok(BootstrapOutcome::LostClaim),
            Err(e) => Err(e.into()),
        };
    }

    let evidence_dir = evidence.write_spec(&job)?;
    if opts.redirect_stdio {
        redirect_stdio(&evidence_dir)?;
    }

    match store.claim(job_id, worker_id, std::process::id()) {
        Ok(()) => {}
        Err(StoreError::ClaimConflict(_)) => {
            debug!(job_id = %job_id, "claim conflict; exiting cleanly");
            return Ok(BootstrapOutcome::LostClaim);
        }
        Err(e) => return Err(e.into()),
    }
    info!(job_id = %job_id, worker_id = %worker_id, "claimed");

    let heartbeat = HeartbeatThread::spawn(
        store.clone(),
        *job_id,
        *worker_id,
        opts.heartbeat_period,
    );
    let ctx = JobContext::new(store.clone(), *job_id, *worker_id, evidence_dir);
    let result = handler.execute(&job.spec.params, &ctx);
    heartbeat.stop();

    let marked = match &result {
        Ok(value)
            if ctx.abort_observed()
                && value.get("aborted").and_then(|v| v.as_bool()).unwrap_or(false) =>
        {
            info!(job_id = %job_id, "handler returned cooperatively on abort");
            store
                .mark_aborted(job_id, worker_id, StateReason::UserAbort, value.clone())
                .map(|()| BootstrapOutcome::Aborted)
        }
        Ok(value) => store
            .mark_succeeded(job_id, worker_id, value.clone())
            .map(|()| BootstrapOutcome::Succeeded),
        Err(failure) => {
            warn!(job_id = %job_id, error = %failure, "handler raised");
            store
                .mark_failed(job_id, worker_id, StateReason::HandlerRaised, &failure.0)
                .map(|()| BootstrapOutcome::HandlerFailed)
        }
    };

    let outcome = match marked {
        Ok(outcome) => outcome,
        Err(e) if e.is_contention() => {
            // The supervisor took the row (escalated abort or orphaned) and
            // already wrote evidence for it.
            debug!(job_id = %job_id, error = %e, "ownership lost before terminal mark");
            return Ok(BootstrapOutcome::LostClaim);
        }
        Err(e) => return Err(e.into()),
    };

    evidence.write_bundle(&store.get(job_id)?)?;
    info!(job_id = %job_id, outcome = ?outcome, "worker done");
    Ok(outcome)
}

/// Point fds 1 and 2 at append-mode log files in the evidence directory, so
/// everything the handler prints is captured even through a hard crash.
fn redirect_stdio(evidence_dir: &std::path::Path) -> Result<(), SupervisorError> {
    use std::os::fd::AsRawFd;

    for (name, fd) in [("stdout.log", 1), ("stderr.log", 2)] {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(evidence_dir.join(name))?;
        nix::unistd::dup2(file.as_raw_fd(), fd).map_err(std::io::Error::from)?;
        // The original descriptor may drop; fds 1/2 stay pointed at the file.
    }
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
