// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer get` — show one job.

use clap::Args;
use gaffer_core::{format_utc_ms, JobId};
use std::path::PathBuf;

#[derive(Args)]
pub struct GetArgs {
    job_id: String,

    #[arg(long)]
    store: Option<PathBuf>,

    /// Print the raw job record as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: GetArgs) -> anyhow::Result<()> {
    let store = super::open_store(args.store)?;
    let job = store.get(&JobId::from_string(&args.job_id))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    let reason = job
        .state_reason
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    println!("Job:      {}", job.id);
    println!("Type:     {}", job.spec.job_type);
    println!("State:    {}{}", job.state, reason);
    println!("Created:  {}", format_utc_ms(job.created_at_ms));
    if let Some(at) = job.claimed_at_ms {
        println!("Started:  {}", format_utc_ms(at));
    }
    if let Some(at) = job.finished_at_ms {
        println!("Finished: {}", format_utc_ms(at));
    }
    if let Some(worker) = &job.worker_id {
        println!("Worker:   {worker}");
    }
    if let Some(phase) = &job.progress.phase {
        match job.progress.fraction {
            Some(f) => println!("Progress: {phase} ({:.0}%)", f * 100.0),
            None => println!("Progress: {phase}"),
        }
    }
    if job.abort_requested && !job.is_terminal() {
        println!("Abort:    requested");
    }
    if let Some(failure) = &job.failure {
        println!("Failure:  [{}] {}", failure.code, failure.message);
    }
    if !job.result.as_object().map(|o| o.is_empty()).unwrap_or(false) {
        println!("Result:   {}", job.result);
    }
    Ok(())
}
