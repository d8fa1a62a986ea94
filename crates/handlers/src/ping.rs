// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin `ping` handler: sleep, heartbeat, answer.
//!
//! Exists for round-trip verification of the whole pipeline. Params:
//!
//! - `sleep_seconds` (number ≥ 0, default 0): how long to sleep.
//! - `ignore_abort` (bool, default false): keep sleeping through abort
//!   requests, so forceful escalation can be exercised end-to-end.

use crate::context::JobContext;
use crate::handler::{Handler, HandlerFailure, MalformedSpec};
use serde_json::{json, Value};
use std::time::Duration;

const SLICE: Duration = Duration::from_millis(50);
const SLICES_PER_PROGRESS: u32 = 10;

pub struct PingHandler;

impl PingHandler {
    fn sleep_seconds(params: &Value) -> f64 {
        params
            .get("sleep_seconds")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    fn ignore_abort(params: &Value) -> bool {
        params
            .get("ignore_abort")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl Handler for PingHandler {
    fn validate(&self, params: &Value) -> Result<(), MalformedSpec> {
        if !params.is_object() {
            return Err(MalformedSpec::new("params must be an object"));
        }
        if let Some(v) = params.get("sleep_seconds") {
            match v.as_f64() {
                Some(secs) if secs >= 0.0 && secs.is_finite() => {}
                _ => {
                    return Err(MalformedSpec::new(
                        "sleep_seconds must be a non-negative number",
                    ))
                }
            }
        }
        if let Some(v) = params.get("ignore_abort") {
            if !v.is_boolean() {
                return Err(MalformedSpec::new("ignore_abort must be a boolean"));
            }
        }
        Ok(())
    }

    fn execute(&self, params: &Value, ctx: &JobContext) -> Result<Value, HandlerFailure> {
        let total = Duration::from_secs_f64(Self::sleep_seconds(params));
        let ignore_abort = Self::ignore_abort(params);

        let mut slept = Duration::ZERO;
        let mut slices: u32 = 0;
        while slept < total {
            if !ignore_abort && ctx.is_abort_requested() {
                return Ok(json!({
                    "aborted": true,
                    "slept_seconds": slept.as_secs_f64(),
                }));
            }
            let nap = SLICE.min(total - slept);
            std::thread::sleep(nap);
            slept += nap;

            slices += 1;
            if slices % SLICES_PER_PROGRESS == 0 {
                let fraction = slept.as_secs_f64() / total.as_secs_f64();
                ctx.report_progress(fraction, "sleeping");
            }
        }

        Ok(json!({ "slept_seconds": total.as_secs_f64() }))
    }

    fn estimate_cost(&self, params: &Value) -> Option<String> {
        Some(format!("{}s sleep", Self::sleep_seconds(params)))
    }
}

#[cfg(test)]
#[path = "ping_tests.rs"]
mod tests;
