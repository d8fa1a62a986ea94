// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod abort;
pub mod get;
pub mod list;
pub mod submit;
pub mod supervise;
pub mod worker;

use gaffer_storage::JobStore;
use gaffer_supervisor::Config;
use std::path::PathBuf;

/// Resolve the store path: explicit flag, else the configured default.
pub(crate) fn store_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| Config::default().store_path)
}

/// Open the store a read-only client or submitter talks to.
pub(crate) fn open_store(flag: Option<PathBuf>) -> anyhow::Result<JobStore> {
    let path = store_path(flag);
    Ok(JobStore::open(&path)?)
}
