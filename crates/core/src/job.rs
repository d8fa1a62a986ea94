// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job row, state machine, and terminal reason codes.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Assigned at submission and stable for the lifetime of the store.
    pub struct JobId("job-");
}

/// Lifecycle state of a job.
///
/// `Queued` and `Running` are live; the other four are terminal and a row in
/// any of them is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
    Orphaned,
}

impl JobState {
    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Aborted | JobState::Orphaned
        )
    }
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Aborted => "aborted",
        Orphaned => "orphaned",
    }
}

/// Error parsing a [`JobState`] from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown job state: {0}")]
pub struct UnknownState(pub String);

impl std::str::FromStr for JobState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(JobState::Queued),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            "aborted" => Ok(JobState::Aborted),
            "orphaned" => Ok(JobState::Orphaned),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Machine tag explaining how a job reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    UserAbort,
    AbortEscalated,
    AbortedBeforeRun,
    HeartbeatTimeout,
    HandlerRaised,
    MalformedSpec,
    UnknownJobType,
    WorkerCrashed,
}

impl StateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateReason::UserAbort => "user_abort",
            StateReason::AbortEscalated => "abort_escalated",
            StateReason::AbortedBeforeRun => "aborted_before_run",
            StateReason::HeartbeatTimeout => "heartbeat_timeout",
            StateReason::HandlerRaised => "handler_raised",
            StateReason::MalformedSpec => "malformed_spec",
            StateReason::UnknownJobType => "unknown_job_type",
            StateReason::WorkerCrashed => "worker_crashed",
        }
    }
}

impl std::fmt::Display for StateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The immutable parameter bag provided at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Key into the handler registry.
    pub job_type: String,
    /// Handler-defined parameters.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Submitter-defined metadata; opaque to the core.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl JobSpec {
    pub fn new(job_type: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            params,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Advisory progress report, updated via heartbeats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Fraction complete in `[0, 1]`, if the handler reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f64>,
    /// Free-form phase label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Failure detail recorded on FAILED terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

/// A job row.
///
/// Mutated only through store transitions; a terminal row never changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<StateReason>,
    /// Handler-produced result summary; empty object until a handler reports one.
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(default)]
    pub progress: Progress,
    /// FIFO position assigned at submission.
    pub seq: u64,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    /// Set when the job is claimed; non-null exactly for rows that ever ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pid: Option<u32>,
    #[serde(default)]
    pub abort_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_requested_at_ms: Option<u64>,
}

impl Job {
    /// Create a fresh QUEUED row.
    pub fn queued(id: JobId, spec: JobSpec, seq: u64, at_ms: u64) -> Self {
        Self {
            id,
            spec,
            state: JobState::Queued,
            state_reason: None,
            result: serde_json::Value::Object(serde_json::Map::new()),
            failure: None,
            progress: Progress::default(),
            seq,
            created_at_ms: at_ms,
            updated_at_ms: at_ms,
            claimed_at_ms: None,
            finished_at_ms: None,
            last_heartbeat_at_ms: None,
            worker_id: None,
            worker_pid: None,
            abort_requested: false,
            abort_requested_at_ms: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Stamp `updated_at_ms`, keeping it strictly monotonic per row.
    pub fn touch(&mut self, at_ms: u64) {
        self.updated_at_ms = at_ms.max(self.updated_at_ms + 1);
    }

    /// Age of the most recent heartbeat relative to `now_ms`.
    ///
    /// `None` for rows that never ran.
    pub fn heartbeat_age_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_heartbeat_at_ms
            .map(|hb| now_ms.saturating_sub(hb))
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-test",
        }
        set {
            spec: JobSpec = JobSpec::new("ping", serde_json::json!({"sleep_seconds": 0.0})),
            state: JobState = JobState::Queued,
            result: serde_json::Value = serde_json::Value::Object(serde_json::Map::new()),
            progress: Progress = Progress::default(),
            seq: u64 = 1,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000,
            abort_requested: bool = false,
        }
        option {
            state_reason: StateReason = None,
            failure: Failure = None,
            claimed_at_ms: u64 = None,
            finished_at_ms: u64 = None,
            last_heartbeat_at_ms: u64 = None,
            worker_id: WorkerId = None,
            worker_pid: u32 = None,
            abort_requested_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
