//! `apivcs init [--repo <path>] [--force]`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use apivcs_core::ledger;

use super::resolve_root;

/// Create the revision ledger for a repository.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository root (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Discard an existing ledger and assign a new repository id.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<ExitCode> {
        let root = resolve_root(self.repo.as_deref())?;
        let identity = ledger::init(&root, self.force)
            .with_context(|| format!("failed to initialize '{}'", root.display()))?;

        println!("✓ Initialized repository {}", identity.repo_id);
        println!("  Ledger: {}", ledger::ledger_path(&root).display());
        Ok(ExitCode::SUCCESS)
    }
}
