// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical receipt and its serialization rules.

use gaffer_core::{format_utc_ms, Job, JobState, StateReason};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Serialize as canonical JSON: compact, UTF-8, keys sorted.
///
/// Values round-trip through `serde_json::Value`, whose object type is a
/// sorted map, so re-serializing a parsed document is the identity. This is
/// what makes manifests content-addressable.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Stable hash of the submitted spec: sha256 hex over its canonical JSON.
pub fn spec_fingerprint(spec: &gaffer_core::JobSpec) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(spec)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("{:x}", digest))
}

/// One produced file, as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub size_bytes: u64,
}

/// The canonical receipt written last into every evidence bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub job_id: String,
    pub job_type: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    /// ISO-8601 UTC with `Z`.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Every bundle file except the manifests themselves.
    pub files: Vec<ManifestFile>,
    pub inputs_fingerprint: String,
}

impl Manifest {
    /// Build the receipt for a terminal job over the given file listing.
    pub fn for_job(job: &Job, files: Vec<ManifestFile>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            job_id: job.id.to_string(),
            job_type: job.spec.job_type.clone(),
            state: job.state,
            state_reason: job.state_reason,
            created_at: format_utc_ms(job.created_at_ms),
            started_at: job.claimed_at_ms.map(format_utc_ms),
            finished_at: job.finished_at_ms.map(format_utc_ms),
            files,
            inputs_fingerprint: spec_fingerprint(&job.spec)?,
        })
    }
}

/// `state.json`: the final state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDoc {
    pub job_id: String,
    pub job_type: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<gaffer_core::Failure>,
}

impl StateDoc {
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            job_type: job.spec.job_type.clone(),
            state: job.state,
            state_reason: job.state_reason,
            created_at: format_utc_ms(job.created_at_ms),
            updated_at: format_utc_ms(job.updated_at_ms),
            started_at: job.claimed_at_ms.map(format_utc_ms),
            finished_at: job.finished_at_ms.map(format_utc_ms),
            worker_id: job.worker_id.map(|w| w.to_string()),
            failure: job.failure.clone(),
        }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
