//! apivcs: track API-management projects in a local repository and push
//! their changes to environments.
//!
//! # Usage
//!
//! ```text
//! apivcs init [--repo <path>] [--force]
//! apivcs status -e <env> [--from last-attempted|last-successful] [--json]
//! apivcs push -e <env> [--workers N] [--timeout SECS] [--repo-id ID] [--json]
//! apivcs deploy -e <env> [--skip-rollback] [...push flags]
//! apivcs rollback -e <env> [...push flags]
//! apivcs env list
//! ```

mod commands;
mod config;
mod remote;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    deploy::DeployArgs, env::EnvCommand, init::InitArgs, push::PushArgs,
    rollback::RollbackArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "apivcs",
    version,
    about = "Version API-management projects and push them to environments",
    long_about = None,
)]
struct Cli {
    /// Log engine activity to stderr (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the revision ledger (vcs.yaml) for a repository.
    Init(InitArgs),

    /// Show what a push to an environment would send.
    Status(StatusArgs),

    /// Send local changes to an environment.
    Push(PushArgs),

    /// Push, and roll back to the last successful revision on failure.
    Deploy(DeployArgs),

    /// Restore an environment to its last successful revision.
    Rollback(RollbackArgs),

    /// Inspect configured environments.
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Deploy(args) => args.run(),
        Commands::Rollback(args) => args.run(),
        Commands::Env { command } => commands::env::run(command),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
