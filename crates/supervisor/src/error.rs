// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Store(#[from] gaffer_storage::StoreError),

    #[error(transparent)]
    Evidence(#[from] gaffer_evidence::EvidenceError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
