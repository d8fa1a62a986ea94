// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy.

use gaffer_core::JobId;
use thiserror::Error;

/// Errors surfaced by store operations.
///
/// The contention variants (`ClaimConflict`, `OwnerMismatch`, `NotRunning`,
/// `NotQueued`) are expected outcomes of racing callers, not faults; callers
/// handle them without logging at error level.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job already claimed or not claimable: {0}")]
    ClaimConflict(JobId),

    #[error("caller does not own job: {0}")]
    OwnerMismatch(JobId),

    #[error("job is not running: {0}")]
    NotRunning(JobId),

    #[error("job is not queued: {0}")]
    NotQueued(JobId),

    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// True for the contention variants that racing callers expect to see.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            StoreError::ClaimConflict(_)
                | StoreError::OwnerMismatch(_)
                | StoreError::NotRunning(_)
                | StoreError::NotQueued(_)
        )
    }
}
