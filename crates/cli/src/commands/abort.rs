// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer abort` — request cooperative termination.

use clap::Args;
use gaffer_core::JobId;
use std::path::PathBuf;

#[derive(Args)]
pub struct AbortArgs {
    job_id: String,

    #[arg(long)]
    store: Option<PathBuf>,
}

pub async fn run(args: AbortArgs) -> anyhow::Result<()> {
    let store = super::open_store(args.store)?;
    let id = JobId::from_string(&args.job_id);
    store.request_abort(&id)?;
    println!("abort requested for {id}");
    Ok(())
}
