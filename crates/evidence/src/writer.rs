// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence bundle writer.

use crate::manifest::{canonical_json, Manifest, ManifestFile, StateDoc};
use gaffer_core::{Job, JobId};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Captured stream bound: the last 64 KiB are retained, plus a size marker.
pub const LOG_TAIL_BYTES: u64 = 64 * 1024;

const LOG_FILES: [&str; 2] = ["stdout.log", "stderr.log"];

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("evidence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("evidence serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes per-job artifact bundles under `<outputs_root>/jobs/<job_id>/`.
///
/// Both the worker (normal terminals) and the supervisor (orphans, escalated
/// aborts, crashes) call this; log files already present from the worker's
/// stream redirection are kept and tailed, never clobbered.
pub struct EvidenceWriter {
    outputs_root: PathBuf,
}

impl EvidenceWriter {
    pub fn new(outputs_root: impl Into<PathBuf>) -> Self {
        Self { outputs_root: outputs_root.into() }
    }

    /// The directory owned by one job.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.outputs_root.join("jobs").join(job_id.as_str())
    }

    /// Create the job directory; the worker calls this before redirecting
    /// its streams into it.
    pub fn create_job_dir(&self, job_id: &JobId) -> Result<PathBuf, EvidenceError> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Create the directory and drop the spec snapshot into it, so even an
    /// in-progress directory identifies the work it belongs to.
    pub fn write_spec(&self, job: &Job) -> Result<PathBuf, EvidenceError> {
        let dir = self.create_job_dir(&job.id)?;
        write_atomic(&dir.join("spec.json"), canonical_json(&job.spec)?.as_bytes())?;
        Ok(dir)
    }

    /// Emit the full bundle for a terminal job and return its directory.
    ///
    /// Order matters: data files first, `manifest.json` next, the canonical
    /// `<job_type>_manifest.json` strictly last. Completeness is signaled by
    /// the canonical receipt alone.
    pub fn write_bundle(&self, job: &Job) -> Result<PathBuf, EvidenceError> {
        let dir = self.create_job_dir(&job.id)?;

        write_atomic(&dir.join("spec.json"), canonical_json(&job.spec)?.as_bytes())?;
        write_atomic(
            &dir.join("state.json"),
            canonical_json(&StateDoc::for_job(job))?.as_bytes(),
        )?;
        write_atomic(&dir.join("result.json"), canonical_json(&job.result)?.as_bytes())?;

        for name in LOG_FILES {
            let path = dir.join(name);
            if !path.exists() {
                fs::File::create(&path)?;
            }
            tail_in_place(&path, LOG_TAIL_BYTES)?;
        }

        let manifest = Manifest::for_job(job, list_bundle_files(&dir)?)?;
        let body = canonical_json(&manifest)?;
        write_atomic(&dir.join("manifest.json"), body.as_bytes())?;
        // The canonical receipt lands last; its rename completes the bundle.
        let receipt = format!("{}_manifest.json", job.spec.job_type);
        write_atomic(&dir.join(receipt), body.as_bytes())?;

        tracing::debug!(job_id = %job.id, dir = %dir.display(), "evidence bundle written");
        Ok(dir)
    }

    /// Whether the bundle for `job_id` is complete (canonical receipt present).
    pub fn is_complete(&self, job_id: &JobId, job_type: &str) -> bool {
        self.job_dir(job_id)
            .join(format!("{job_type}_manifest.json"))
            .exists()
    }
}

/// Bundle files listed in the manifest: everything except the manifests
/// themselves and temp droppings, sorted by name.
fn list_bundle_files(dir: &Path) -> Result<Vec<ManifestFile>, EvidenceError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with("manifest.json") || name.ends_with(".tmp") {
            continue;
        }
        files.push(ManifestFile { name, size_bytes: entry.metadata()?.len() });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Write via a temp file in the same directory, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EvidenceError> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_data()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Bound a captured stream: keep the last `bound` bytes behind a one-line
/// size marker. Files within the bound are left untouched.
fn tail_in_place(path: &Path, bound: u64) -> Result<(), EvidenceError> {
    let len = fs::metadata(path)?.len();
    if len <= bound {
        return Ok(());
    }

    let data = fs::read(path)?;
    let keep_from = data.len() - bound as usize;
    let marker = format!("[log truncated: kept last {} of {} bytes]\n", bound, len);

    let mut tailed = Vec::with_capacity(marker.len() + bound as usize);
    tailed.extend_from_slice(marker.as_bytes());
    tailed.extend_from_slice(&data[keep_from..]);
    write_atomic(path, &tailed)?;
    Ok(())
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
