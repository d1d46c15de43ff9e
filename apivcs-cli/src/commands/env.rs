//! `apivcs env list`

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use crate::config;

/// Inspect configured environments.
#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// List environments from ~/.apivcs/config.yaml.
    List,
}

#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "environment")]
    name: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "target")]
    target: String,
    #[tabled(rename = "repo id")]
    repo_id: String,
    #[tabled(rename = "deployment")]
    deployment: String,
}

pub fn run(cmd: EnvCommand) -> Result<ExitCode> {
    match cmd {
        EnvCommand::List => list(),
    }
}

fn list() -> Result<ExitCode> {
    let config = config::load()?;
    if config.environments.is_empty() {
        println!("No environments configured.");
        println!("Add them to ~/.apivcs/config.yaml");
        return Ok(ExitCode::SUCCESS);
    }

    let rows: Vec<EnvRow> = config
        .environments
        .iter()
        .map(|(name, env)| EnvRow {
            name: name.clone(),
            kind: format!("{:?}", env.kind).to_lowercase(),
            target: env.location(),
            repo_id: env.repo_id.clone().unwrap_or_else(|| "-".to_string()),
            deployment: env
                .deployment_path
                .as_ref()
                .map_or_else(|| "-".to_string(), |path| path.display().to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(ExitCode::SUCCESS)
}
