//! `apivcs push -e <env>`: send local changes to an environment.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use super::report::{print_json, print_result};
use super::EngineArgs;

#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

impl PushArgs {
    pub fn run(self) -> Result<ExitCode> {
        let session = self.engine.session()?;
        let result = apivcs_sync::push(
            &session.root,
            &session.environment,
            &*session.api,
            &session.options,
        )
        .with_context(|| format!("push to '{}' failed", session.environment))?;

        if self.engine.json {
            print_json(&result)?;
        } else {
            print_result("push", &result);
        }
        Ok(if result.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
