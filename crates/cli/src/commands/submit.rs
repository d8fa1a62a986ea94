// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer submit` — enqueue a job.

use anyhow::Context;
use clap::Args;
use gaffer_supervisor::submit_job;
use gaffer_handlers::HandlerRegistry;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct SubmitArgs {
    /// Job type key (e.g. `ping`)
    job_type: String,

    /// Handler parameters as a JSON object
    #[arg(long, default_value = "{}")]
    spec: String,

    /// Submitter metadata as a JSON object
    #[arg(long, default_value = "{}")]
    meta: String,

    #[arg(long)]
    store: Option<PathBuf>,

    /// Block until the job reaches a terminal state
    #[arg(long)]
    wait: bool,
}

pub async fn run(args: SubmitArgs) -> anyhow::Result<()> {
    let params: serde_json::Value =
        serde_json::from_str(&args.spec).context("--spec must be valid JSON")?;
    let metadata: serde_json::Value =
        serde_json::from_str(&args.meta).context("--meta must be valid JSON")?;

    let store = super::open_store(args.store)?;
    let registry = HandlerRegistry::builtin();
    let id = submit_job(&store, &registry, &args.job_type, params, metadata)?;
    println!("{id}");

    if args.wait {
        loop {
            let job = store.get(&id)?;
            if job.is_terminal() {
                let reason = job
                    .state_reason
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default();
                println!("{}{}", job.state, reason);
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }
    Ok(())
}
