//! `migrasync status`: artifact directories versus the log.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use migrasync_core::NamespaceName;
use migrasync_sync::{
    status::{check_all, format_datetime_age, ArtifactState, NamespaceState, NamespaceStatus},
    SyncScope,
};

use super::open_inspector;

/// Arguments for `migrasync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter to a single namespace.
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let orch = open_inspector(config)?;
        let scope = match self.namespace {
            Some(name) => SyncScope::Namespaces(vec![NamespaceName::from(name)]),
            None => SyncScope::All,
        };
        let statuses = check_all(orch.store(), orch.config(), orch.gate(), &scope)
            .context("status check failed")?;

        if self.json {
            print_json(&statuses)?;
        } else {
            print_table(&statuses);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson<'a> {
    summary: StatusSummaryJson,
    namespaces: &'a [NamespaceStatus],
}

#[derive(Serialize)]
struct StatusSummaryJson {
    namespaces: usize,
    unmanaged: usize,
    out_of_sync: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "namespace")]
    namespace: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "in-sync")]
    in_sync: usize,
    #[tabled(rename = "missing")]
    missing: usize,
    #[tabled(rename = "drifted")]
    drifted: usize,
    #[tabled(rename = "unpublished")]
    unpublished: usize,
    #[tabled(rename = "last publish")]
    last_publish: String,
}

fn needs_pull(status: &NamespaceStatus) -> bool {
    status.state == NamespaceState::Tracked && !status.is_clean()
}

fn print_json(statuses: &[NamespaceStatus]) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            namespaces: statuses.len(),
            unmanaged: statuses
                .iter()
                .filter(|s| s.state == NamespaceState::Unmanaged)
                .count(),
            out_of_sync: statuses.iter().filter(|s| needs_pull(s)).count(),
        },
        namespaces: statuses,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(statuses: &[NamespaceStatus]) {
    let out_of_sync = statuses.iter().filter(|s| needs_pull(s)).count();
    println!(
        "migrasync v{} | {} namespaces | {} out of sync",
        env!("CARGO_PKG_VERSION"),
        statuses.len(),
        out_of_sync,
    );
    if statuses.is_empty() {
        println!("No namespaces configured.");
        return;
    }

    let rows: Vec<StatusTableRow> = statuses
        .iter()
        .map(|s| StatusTableRow {
            namespace: s.namespace.to_string(),
            status: namespace_label(s),
            in_sync: s.count(ArtifactState::InSync),
            missing: s.count(ArtifactState::Missing),
            drifted: s.count(ArtifactState::Drifted),
            unpublished: s.count(ArtifactState::Unpublished),
            last_publish: s
                .last_published()
                .map(format_datetime_age)
                .unwrap_or_else(|| "never".to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for status in statuses.iter().filter(|s| needs_pull(s)) {
        println!("{}", status.namespace.to_string().bold());
        for artifact in &status.artifacts {
            if artifact.state != ArtifactState::InSync {
                println!("  {}  {}", state_indicator(artifact.state), artifact.name);
            }
        }
    }

    if out_of_sync > 0 {
        println!("Run 'migrasync pull' to bring directories in line with the log.");
    }
}

fn namespace_label(status: &NamespaceStatus) -> String {
    match status.state {
        NamespaceState::Unmanaged => "UNMANAGED".bright_black().to_string(),
        NamespaceState::Unresolved => "UNRESOLVED".yellow().to_string(),
        NamespaceState::Tracked if status.is_clean() => "IN SYNC".green().to_string(),
        NamespaceState::Tracked => "OUT OF SYNC".red().to_string(),
    }
}

fn state_indicator(state: ArtifactState) -> String {
    let label = state.label();
    match state {
        ArtifactState::InSync => label.green().to_string(),
        ArtifactState::Missing => label.yellow().to_string(),
        ArtifactState::Drifted => label.red().to_string(),
        ArtifactState::Unpublished => label.magenta().to_string(),
    }
}
