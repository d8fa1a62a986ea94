// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer worker` — hidden child entry point.
//!
//! Spawned by the supervisor with one job id. Synchronous: the exit code is
//! part of the worker contract, so this path never goes through the async
//! error plumbing.

use clap::Args;
use gaffer_core::{JobId, WorkerId};
use gaffer_handlers::HandlerRegistry;
use gaffer_supervisor::{bootstrap, BootstrapOptions, EXIT_BOOTSTRAP_CRASH};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct WorkerArgs {
    job_id: String,

    #[arg(long)]
    worker_id: String,

    #[arg(long)]
    store: PathBuf,

    #[arg(long)]
    outputs: PathBuf,

    /// Heartbeat period in seconds
    #[arg(long, default_value_t = 2.0)]
    heartbeat_period: f64,
}

pub fn run(args: WorkerArgs) -> i32 {
    let job_id = JobId::from_string(&args.job_id);
    let worker_id = WorkerId::from_string(&args.worker_id);
    let registry = HandlerRegistry::builtin();
    let opts = BootstrapOptions {
        store_path: args.store,
        outputs_root: args.outputs,
        heartbeat_period: Duration::from_secs_f64(args.heartbeat_period.max(0.1)),
        redirect_stdio: true,
    };

    match bootstrap::run(&job_id, &worker_id, &registry, &opts) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("worker bootstrap crashed: {e}");
            EXIT_BOOTSTRAP_CRASH
        }
    }
}
