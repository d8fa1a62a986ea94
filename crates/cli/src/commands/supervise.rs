// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer supervise` — the long-running coordinator.

use anyhow::Context;
use clap::Args;
use gaffer_core::SystemClock;
use gaffer_handlers::HandlerRegistry;
use gaffer_storage::JobStore;
use gaffer_supervisor::{Config, ExecSpawner, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct SuperviseArgs {
    /// TOML config file; unset keys take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the store ledger path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Override the outputs root
    #[arg(long)]
    outputs: Option<PathBuf>,

    /// Override the concurrency bound
    #[arg(long)]
    max_workers: Option<usize>,
}

pub async fn run(args: SuperviseArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(store) = args.store {
        config.store_path = store;
    }
    if let Some(outputs) = args.outputs {
        config.outputs_root = outputs;
    }
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }

    std::fs::create_dir_all(&config.outputs_root)
        .with_context(|| format!("create outputs root {}", config.outputs_root.display()))?;

    let store = Arc::new(JobStore::open(&config.store_path)?);
    let registry = Arc::new(HandlerRegistry::builtin());
    let spawner = ExecSpawner::current_exe(&config).context("resolve worker executable")?;
    let mut supervisor = Supervisor::new(config, store, registry, spawner, SystemClock);

    tokio::select! {
        result = supervisor.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; workers keep running and a restart resumes from the store");
        }
    }
    Ok(())
}
