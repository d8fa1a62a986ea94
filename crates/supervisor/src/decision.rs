// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure tick decisions.
//!
//! The loop phases gather row snapshots and act on what these functions
//! select; keeping the selection side-effect-free makes the timeout logic
//! testable without processes or clocks.

use gaffer_core::{Job, JobId, JobState};
use std::time::Duration;

/// RUNNING rows whose heartbeat is older than `timeout` at `now_ms`.
///
/// Rows without a heartbeat stamp are never selected; claim stamps the first
/// heartbeat, so such rows are not RUNNING in a consistent store.
pub fn stale_running(jobs: &[Job], now_ms: u64, timeout: Duration) -> Vec<JobId> {
    let timeout_ms = timeout.as_millis() as u64;
    jobs.iter()
        .filter(|j| j.state == JobState::Running)
        .filter(|j| {
            j.heartbeat_age_ms(now_ms)
                .map(|age| age > timeout_ms)
                .unwrap_or(false)
        })
        .map(|j| j.id)
        .collect()
}

/// RUNNING rows whose abort request has outlived the cooperative deadline.
pub fn escalation_due(jobs: &[Job], now_ms: u64, deadline: Duration) -> Vec<JobId> {
    let deadline_ms = deadline.as_millis() as u64;
    jobs.iter()
        .filter(|j| j.state == JobState::Running && j.abort_requested)
        .filter(|j| {
            j.abort_requested_at_ms
                .map(|at| now_ms.saturating_sub(at) > deadline_ms)
                .unwrap_or(false)
        })
        .map(|j| j.id)
        .collect()
}

/// QUEUED rows with a pending abort request, to be terminated without a run.
pub fn aborted_while_queued(jobs: &[Job]) -> Vec<JobId> {
    jobs.iter()
        .filter(|j| j.state == JobState::Queued && j.abort_requested)
        .map(|j| j.id)
        .collect()
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
