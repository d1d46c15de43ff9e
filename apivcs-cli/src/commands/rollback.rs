//! `apivcs rollback -e <env>`: restore the last successful revision.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use super::report::{print_json, print_result};
use super::EngineArgs;

#[derive(Args, Debug)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

impl RollbackArgs {
    pub fn run(self) -> Result<ExitCode> {
        let session = self.engine.session()?;
        let result = apivcs_sync::rollback(
            &session.root,
            &session.environment,
            &*session.api,
            &session.options,
        )
        .with_context(|| format!("rollback of '{}' failed", session.environment))?;

        if self.engine.json {
            print_json(&result)?;
        } else {
            print_result("rollback", &result);
        }
        Ok(if result.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
