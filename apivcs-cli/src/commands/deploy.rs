//! `apivcs deploy -e <env> [--skip-rollback]`: push, rolling back on failure.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use apivcs_sync::RollbackStatus;

use super::report::{print_json, print_result};
use super::EngineArgs;

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Leave the environment as is when the push fails.
    #[arg(long)]
    pub skip_rollback: bool,
}

impl DeployArgs {
    pub fn run(self) -> Result<ExitCode> {
        let session = self.engine.session()?;
        let result = apivcs_sync::deploy(
            &session.root,
            &session.environment,
            &*session.api,
            &session.options,
            self.skip_rollback,
        )
        .with_context(|| format!("deploy to '{}' failed", session.environment))?;

        if self.engine.json {
            print_json(&result)?;
        } else {
            print_result("push", &result.push);
            match &result.rollback {
                RollbackStatus::NotNeeded => {}
                RollbackStatus::Skipped => println!(
                    "{} rollback skipped; '{}' is left at the failed revision",
                    "!".yellow().bold(),
                    session.environment
                ),
                RollbackStatus::Unavailable { reason } => {
                    println!("{} cannot roll back: {reason}", "✗".red().bold())
                }
                RollbackStatus::Completed { result } => print_result("rollback", result),
            }
        }
        Ok(if result.success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
