// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission façade.
//!
//! The store records whatever it is given; this is the gate where unknown
//! job types and malformed parameter bags are rejected synchronously, before
//! any row exists.

use gaffer_core::{JobId, JobSpec};
use gaffer_handlers::{HandlerRegistry, MalformedSpec};
use gaffer_storage::{JobStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error(transparent)]
    Malformed(#[from] MalformedSpec),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate and enqueue one job; returns its identifier.
pub fn submit_job(
    store: &JobStore,
    registry: &HandlerRegistry,
    job_type: &str,
    params: serde_json::Value,
    metadata: serde_json::Value,
) -> Result<JobId, SubmitError> {
    let Some(handler) = registry.resolve(job_type) else {
        return Err(SubmitError::UnknownJobType(job_type.to_string()));
    };
    handler.validate(&params)?;

    if let Some(hint) = handler.estimate_cost(&params) {
        tracing::debug!(job_type, hint, "estimated cost");
    }

    let spec = JobSpec::new(job_type, params).with_metadata(metadata);
    let id = store.submit(spec)?;
    tracing::info!(job_id = %id, job_type, "job submitted");
    Ok(id)
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
