// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gaffer: single-host job supervisor CLI.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gaffer", version, about = "Single-host job supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor loop
    Supervise(commands::supervise::SuperviseArgs),
    /// Submit a job
    Submit(commands::submit::SubmitArgs),
    /// Request cooperative abort of a job
    Abort(commands::abort::AbortArgs),
    /// Show one job
    Get(commands::get::GetArgs),
    /// List jobs
    List(commands::list::ListArgs),
    /// Worker entry point (spawned by the supervisor)
    #[command(hide = true)]
    Worker(commands::worker::WorkerArgs),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        // The worker is synchronous and must control its exit code exactly.
        Command::Worker(args) => commands::worker::run(args),
        command => run_async(command),
    };
    std::process::exit(code);
}

fn run_async(command: Command) -> i32 {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return 1;
        }
    };

    let result = runtime.block_on(async {
        match command {
            Command::Supervise(args) => commands::supervise::run(args).await,
            Command::Submit(args) => commands::submit::run(args).await,
            Command::Abort(args) => commands::abort::run(args).await,
            Command::Get(args) => commands::get::run(args).await,
            Command::List(args) => commands::list::run(args).await,
            Command::Worker(_) => unreachable!("worker handled synchronously"),
        }
    });

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gaffer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
