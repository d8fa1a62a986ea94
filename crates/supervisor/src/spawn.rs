// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process spawning.

use gaffer_core::{JobId, WorkerId};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Seam between the loop and the OS.
///
/// The production spawner execs this binary's hidden `worker` subcommand; the
/// trait exists so loop tests can substitute cheaper processes.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, job_id: &JobId, worker_id: &WorkerId) -> std::io::Result<Child>;
}

/// Spawns `<program> worker <job_id> --worker-id ...` with stdio detached;
/// the bootstrap redirects its own streams into the evidence directory.
pub struct ExecSpawner {
    program: PathBuf,
    store_path: PathBuf,
    outputs_root: PathBuf,
    heartbeat_period_seconds: f64,
}

impl ExecSpawner {
    pub fn new(
        program: PathBuf,
        store_path: PathBuf,
        outputs_root: PathBuf,
        heartbeat_period_seconds: f64,
    ) -> Self {
        Self { program, store_path, outputs_root, heartbeat_period_seconds }
    }

    /// Production constructor: workers are this very executable.
    pub fn current_exe(config: &crate::config::Config) -> std::io::Result<Self> {
        Ok(Self::new(
            std::env::current_exe()?,
            config.store_path.clone(),
            config.outputs_root.clone(),
            config.heartbeat_period_seconds,
        ))
    }
}

impl ProcessSpawner for ExecSpawner {
    fn spawn(&self, job_id: &JobId, worker_id: &WorkerId) -> std::io::Result<Child> {
        Command::new(&self.program)
            .arg("worker")
            .arg(job_id.as_str())
            .arg("--worker-id")
            .arg(worker_id.as_str())
            .arg("--store")
            .arg(&self.store_path)
            .arg("--outputs")
            .arg(&self.outputs_root)
            .arg("--heartbeat-period")
            .arg(self.heartbeat_period_seconds.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }
}
