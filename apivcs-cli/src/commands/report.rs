//! Terminal and JSON rendering of push / rollback results.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use apivcs_sync::{Action, ProjectResult, PushResult};

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl From<&ProjectResult> for ResultRow {
    fn from(p: &ProjectResult) -> Self {
        Self {
            project: p.key.to_string(),
            action: p.action.to_string(),
            result: if p.failed { "FAILED" } else { "ok" }.to_string(),
            detail: p
                .reason
                .clone()
                .unwrap_or_else(|| p.relative_path.clone()),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize result JSON")?
    );
    Ok(())
}

/// Print one table of the changes in `result`, then a summary line.
pub fn print_result(verb: &str, result: &PushResult) {
    if result.is_noop() {
        match result.revision {
            Some(revision) => println!(
                "{} '{}' is up-to-date; nothing to {verb} (revision {revision})",
                "✓".green(),
                result.environment
            ),
            None => println!(
                "{} '{}' is up-to-date; nothing to {verb}",
                "✓".green(),
                result.environment
            ),
        }
        return;
    }

    let rows: Vec<ResultRow> = result
        .projects
        .iter()
        .filter(|p| p.action != Action::Unchanged)
        .map(ResultRow::from)
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let failed = result.failures().count();
    let summary = format!(
        "{} saved, {} deleted, {} unchanged, {} failed",
        result.count(Action::Save),
        result.count(Action::Delete),
        result.count(Action::Unchanged),
        failed
    );
    let revision = result.revision.unwrap_or_default();
    if failed == 0 {
        println!(
            "{} {verb} to '{}' complete (revision {revision}): {summary}",
            "✓".green().bold(),
            result.environment
        );
    } else {
        println!(
            "{} {verb} to '{}' incomplete (revision {revision}): {summary}",
            "✗".red().bold(),
            result.environment
        );
    }
}
