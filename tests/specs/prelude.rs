// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared spec harness: a temp project with its own store, outputs tree and
//! supervisor process.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Total patience for one lifecycle step.
pub const SPEC_WAIT_MAX_MS: u64 = 20_000;

/// Poll `check` every 100 ms until true or `max_ms` elapsed.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// One isolated gaffer installation under a temp directory.
pub struct Project {
    dir: TempDir,
    supervisor: Option<Child>,
}

impl Project {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("create temp project"), supervisor: None }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store.ledger")
    }

    pub fn outputs_root(&self) -> PathBuf {
        self.dir.path().join("outputs")
    }

    fn bin() -> PathBuf {
        assert_cmd::cargo::cargo_bin("gaffer")
    }

    /// Write a spec-friendly config: fast ticks, short timeouts.
    fn write_config(&self, max_workers: usize) -> PathBuf {
        let path = self.dir.path().join("gaffer.toml");
        let body = format!(
            r#"
store_path = {store:?}
outputs_root = {outputs:?}
max_workers = {max_workers}
tick_period_seconds = 0.2
heartbeat_period_seconds = 0.5
heartbeat_timeout_seconds = 3.0
graceful_termination_seconds = 0.5
abort_escalation_seconds = 2.0
"#,
            store = self.store_path(),
            outputs = self.outputs_root(),
        );
        std::fs::write(&path, body).expect("write config");
        path
    }

    /// Start a supervisor for this project; killed on drop.
    pub fn start_supervisor(&mut self, max_workers: usize) {
        assert!(self.supervisor.is_none(), "supervisor already running");
        let config = self.write_config(max_workers);
        let child = Command::new(Self::bin())
            .arg("supervise")
            .arg("--config")
            .arg(&config)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn supervisor");
        self.supervisor = Some(child);
    }

    /// SIGKILL the supervisor (crash simulation). Workers are left running.
    pub fn kill_supervisor(&mut self) {
        if let Some(mut child) = self.supervisor.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn run_cli(&self, args: &[&str]) -> (bool, String) {
        let output = Command::new(Self::bin())
            .args(args)
            .arg("--store")
            .arg(self.store_path())
            .output()
            .expect("run gaffer CLI");
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (output.status.success(), stdout)
    }

    /// Submit a job, returning its id.
    pub fn submit(&self, job_type: &str, spec: &serde_json::Value) -> String {
        let spec = spec.to_string();
        let (ok, stdout) = self.run_cli(&["submit", job_type, "--spec", &spec]);
        assert!(ok, "submit failed");
        assert!(stdout.starts_with("job-"), "unexpected submit output: {stdout}");
        stdout
    }

    /// Submit expected to be rejected; returns false on acceptance.
    pub fn submit_fails(&self, job_type: &str, spec: &serde_json::Value) -> bool {
        let spec = spec.to_string();
        let (ok, _) = self.run_cli(&["submit", job_type, "--spec", &spec]);
        !ok
    }

    pub fn abort(&self, job_id: &str) {
        let (ok, _) = self.run_cli(&["abort", job_id]);
        assert!(ok, "abort failed");
    }

    /// Full job record as JSON.
    pub fn get(&self, job_id: &str) -> serde_json::Value {
        let (ok, stdout) = self.run_cli(&["get", job_id, "--json"]);
        assert!(ok, "get failed for {job_id}");
        serde_json::from_str(&stdout).expect("get --json output")
    }

    pub fn state_of(&self, job_id: &str) -> String {
        self.get(job_id)["state"].as_str().unwrap_or_default().to_string()
    }

    /// Jobs currently in the given state, via `list --json`.
    pub fn count_in_state(&self, state: &str) -> usize {
        let (ok, stdout) = self.run_cli(&["list", "--json", "--state", state]);
        assert!(ok, "list failed");
        serde_json::from_str::<Vec<serde_json::Value>>(&stdout)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn evidence_dir(&self, job_id: &str) -> PathBuf {
        self.outputs_root().join("jobs").join(job_id)
    }

    /// The canonical receipt, if the bundle is complete.
    pub fn manifest(&self, job_id: &str, job_type: &str) -> Option<serde_json::Value> {
        let path = self.evidence_dir(job_id).join(format!("{job_type}_manifest.json"));
        let body = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&body).ok()
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.kill_supervisor();
    }
}
