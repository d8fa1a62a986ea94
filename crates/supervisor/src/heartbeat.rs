// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side heartbeat thread.

use gaffer_core::{JobId, WorkerId};
use gaffer_storage::JobStore;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Drives `heartbeat` on a timer until stopped.
///
/// Best-effort: a failed write (store contention, lost ownership) is logged
/// at debug and the timer keeps going; the main thread decides what losing
/// ownership means when it records its terminal state.
pub(crate) struct HeartbeatThread {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl HeartbeatThread {
    pub fn spawn(
        store: Arc<JobStore>,
        job_id: JobId,
        worker_id: WorkerId,
        period: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(e) = store.heartbeat(&job_id, &worker_id, None, None) {
                        tracing::debug!(job_id = %job_id, error = %e, "heartbeat write failed");
                    }
                }
            }
        });
        Self { stop_tx, handle }
    }

    /// Signal completion and join the thread.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
