// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp formatting helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format epoch milliseconds as ISO-8601 UTC with a trailing `Z`.
///
/// Millisecond precision, e.g. `2026-02-03T04:05:06.789Z`. Out-of-range
/// values fall back to the epoch rather than panicking.
pub fn format_utc_ms(epoch_ms: u64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format an elapsed duration in milliseconds as a compact human string.
///
/// `42s`, `3m12s`, `2h05m`, `1d03h`.
pub fn format_elapsed_ms(elapsed_ms: u64) -> String {
    let secs = elapsed_ms / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d{:02}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
