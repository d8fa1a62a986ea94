// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer list` — enumerate jobs.

use clap::Args;
use gaffer_core::{format_elapsed_ms, Clock, JobState, SystemClock};
use gaffer_storage::ListFilter;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// Filter by state (queued, running, succeeded, failed, aborted, orphaned)
    #[arg(long)]
    state: Option<JobState>,

    /// Filter by job type
    #[arg(long = "type")]
    job_type: Option<String>,

    #[arg(long)]
    store: Option<PathBuf>,

    /// Print raw job records as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ListArgs) -> anyhow::Result<()> {
    let store = super::open_store(args.store)?;
    let jobs = store.list(&ListFilter { state: args.state, job_type: args.job_type })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("no jobs");
        return Ok(());
    }

    let now_ms = SystemClock.epoch_ms();
    println!("{:<24} {:<10} {:<10} {:>8}  {}", "ID", "TYPE", "STATE", "AGE", "DETAIL");
    for job in jobs {
        let age = format_elapsed_ms(now_ms.saturating_sub(job.created_at_ms));
        let detail = job
            .state_reason
            .map(|r| r.to_string())
            .or_else(|| job.progress.phase.clone())
            .unwrap_or_default();
        println!(
            "{:<24} {:<10} {:<10} {:>8}  {}",
            job.id,
            job.spec.job_type,
            job.state,
            age,
            detail
        );
    }
    Ok(())
}
