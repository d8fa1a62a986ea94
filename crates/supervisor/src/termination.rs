// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful-then-forceful process termination.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a termination attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process was already gone.
    AlreadyGone,
    /// Exited within the grace period after SIGTERM.
    Graceful,
    /// Survived the grace period and ate a SIGKILL.
    Forced,
}

/// Check whether `pid` still exists (signal 0 probe).
pub fn process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
///
/// The caller still owns reaping if the process is its child; this only
/// delivers signals. Works on non-child pids too (orphans from a previous
/// supervisor), where the kernel handles reaping.
pub async fn terminate(pid: u32, grace: Duration) -> Termination {
    let target = Pid::from_raw(pid as i32);

    if kill(target, Signal::SIGTERM).is_err() {
        return Termination::AlreadyGone;
    }

    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        if !process_alive(pid) {
            return Termination::Graceful;
        }
    }

    let _ = kill(target, Signal::SIGKILL);
    Termination::Forced
}

#[cfg(test)]
#[path = "termination_tests.rs"]
mod tests;
