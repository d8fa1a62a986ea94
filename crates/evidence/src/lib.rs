// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-evidence: immutable artifact bundles for terminated jobs.
//!
//! Each terminal job gets a deterministic directory under
//! `<outputs_root>/jobs/<job_id>/`. The canonical `<job_type>_manifest.json`
//! receipt is written last, atomically; its presence is the completeness
//! signal, so a directory without it must not be consumed downstream.

mod manifest;
mod writer;

pub use manifest::{canonical_json, spec_fingerprint, Manifest, ManifestFile, StateDoc};
pub use writer::{EvidenceError, EvidenceWriter, LOG_TAIL_BYTES};
