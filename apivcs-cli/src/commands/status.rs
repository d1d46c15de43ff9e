//! `apivcs status -e <env>`: what a push would send.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use apivcs_core::{EnvironmentName, ProjectType, RevType};
use apivcs_sync::{Action, ClassifiedProject};

use super::report::print_json;
use super::{repo_options, resolve_root};
use crate::config;

/// Arguments for `apivcs status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Environment to compare against.
    #[arg(long, short = 'e', value_name = "ENV")]
    pub environment: String,

    /// Repository root (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Recorded revision to diff against: last-attempted | last-successful.
    #[arg(long, value_name = "REV", default_value = "last-attempted")]
    pub from: RevType,

    /// Refuse to run unless the repository carries this id.
    #[arg(long, value_name = "ID")]
    pub repo_id: Option<String>,

    /// Deployment repository with environment-specific params.
    #[arg(long, value_name = "PATH")]
    pub deployment_repo: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    environment: &'a EnvironmentName,
    from: RevType,
    projects: Vec<StatusProjectJson<'a>>,
}

#[derive(Serialize)]
struct StatusProjectJson<'a> {
    project_type: ProjectType,
    name: &'a str,
    action: Action,
    relative_path: &'a str,
    fingerprint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params_fingerprint: Option<&'a str>,
    previously_failed: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<ExitCode> {
        let root = resolve_root(self.repo.as_deref())?;
        let environment = EnvironmentName::from(self.environment.as_str());
        let config = config::load()?;
        let repo = repo_options(
            config.environments.get(&self.environment),
            self.repo_id.clone(),
            self.deployment_repo.as_deref(),
        )?;

        let classified = apivcs_sync::status(&root, &environment, self.from, &repo)
            .with_context(|| format!("status for '{}' failed", environment))?;

        if self.json {
            print_json(&StatusJson {
                environment: &environment,
                from: self.from,
                projects: classified
                    .iter()
                    .map(|c| StatusProjectJson {
                        project_type: c.key.project_type,
                        name: &c.key.name,
                        action: c.action,
                        relative_path: &c.relative_path,
                        fingerprint: &c.fingerprint,
                        params_fingerprint: c.params_fingerprint.as_deref(),
                        previously_failed: c.previously_failed,
                    })
                    .collect(),
            })?;
        } else {
            print_text(&environment, self.from, &classified);
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_text(environment: &EnvironmentName, from: RevType, classified: &[ClassifiedProject]) {
    let unchanged = classified.iter().filter(|c| !c.is_change()).count();
    if unchanged == classified.len() {
        println!("Everything is up-to-date");
        return;
    }

    println!("Changes for '{environment}' since {from}:");
    for project_type in ProjectType::all() {
        let changes: Vec<&ClassifiedProject> = classified
            .iter()
            .filter(|c| c.key.project_type == *project_type && c.is_change())
            .collect();
        if changes.is_empty() {
            continue;
        }
        println!("{}", project_type.plural_label().bold());
        for change in changes {
            let tag = match change.action {
                Action::Delete => "[delete]".red().to_string(),
                _ => "[save]  ".green().to_string(),
            };
            let failed = if change.previously_failed {
                format!(" {}", "[failed]".yellow())
            } else {
                String::new()
            };
            println!(
                "  {tag} {} ({}){failed}",
                change.key.name, change.relative_path
            );
        }
    }
    if unchanged > 0 {
        println!("{unchanged} unchanged");
    }
}
