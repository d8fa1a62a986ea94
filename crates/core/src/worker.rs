// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker row for in-flight child processes.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker, assigned by the supervisor at spawn.
    pub struct WorkerId("wkr-");
}

/// Lifecycle status of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    /// Spawned but not yet holding a claim.
    Idle,
    /// Holding a claim on exactly one job.
    Busy,
    /// Reaped, or cleaned up after a supervisor restart.
    Exited,
}

crate::simple_display! {
    WorkerStatus {
        Idle => "idle",
        Busy => "busy",
        Exited => "exited",
    }
}

/// A worker row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub pid: u32,
    /// The claimed job, while BUSY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub status: WorkerStatus,
    pub spawned_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at_ms: Option<u64>,
}

impl Worker {
    /// Create a fresh IDLE row.
    pub fn spawned(id: WorkerId, pid: u32, at_ms: u64) -> Self {
        Self {
            id,
            pid,
            job_id: None,
            status: WorkerStatus::Idle,
            spawned_at_ms: at_ms,
            exited_at_ms: None,
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
