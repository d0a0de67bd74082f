//! Subcommand implementations and the helpers they share.

pub mod diff;
pub mod generate;
pub mod init;
pub mod migrate;
pub mod pull;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};

use migrasync_core::{config, NamespaceName, ProjectConfig};
use migrasync_store::BootstrapOutcome;
use migrasync_sync::{
    Applier, CommandApplier, CommandGenerator, Generator, NoGenerator, Orchestrator, PullOutcome,
};

/// Load the explicit config file, or discover one from the current dir.
pub fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("could not determine current directory")?;
            config::discover_from(&cwd).context("no migrasync.yaml found; run `migrasync init` first")?
        }
    };
    config::load_at(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub fn open_orchestrator(explicit: Option<&Path>) -> Result<Orchestrator> {
    let config = load_config(explicit)?;
    let database = config.database.clone();
    Orchestrator::open(config)
        .with_context(|| format!("failed to open artifact log {}", database.display()))
}

/// Read-only handle for `status` and `diff`.
pub fn open_inspector(explicit: Option<&Path>) -> Result<Orchestrator> {
    let config = load_config(explicit)?;
    let database = config.database.clone();
    Orchestrator::open_read_only(config)
        .with_context(|| format!("failed to read artifact log {}", database.display()))
}

/// The configured generator, if any.
pub fn configured_generator(config: &ProjectConfig) -> Option<Box<dyn Generator>> {
    config.generator.as_ref().map(|spec| {
        Box::new(CommandGenerator::new(spec.clone(), &config.project_root)) as Box<dyn Generator>
    })
}

/// The configured generator, or one that never proposes anything.
pub fn generator_or_noop(config: &ProjectConfig) -> Box<dyn Generator> {
    configured_generator(config).unwrap_or_else(|| {
        tracing::warn!("no generator configured; only existing artifacts will be synchronized");
        Box::new(NoGenerator)
    })
}

pub fn configured_applier(config: &ProjectConfig) -> Result<Box<dyn Applier>> {
    let spec = config
        .applier
        .as_ref()
        .context("no applier configured in migrasync.yaml")?;
    Ok(Box::new(CommandApplier::new(spec.clone(), &config.project_root)))
}

pub fn namespace_names(raw: &[String]) -> Vec<NamespaceName> {
    raw.iter().map(|n| NamespaceName::from(n.as_str())).collect()
}

pub fn print_bootstrap(outcome: &BootstrapOutcome) {
    match outcome {
        BootstrapOutcome::Created => println!("✓ created artifact log table"),
        BootstrapOutcome::AlreadyPresent => {}
        BootstrapOutcome::Failed(msg) => println!("! log table bootstrap failed: {msg}"),
    }
}

pub fn print_pulls(pulls: &[(NamespaceName, PullOutcome)]) {
    for (namespace, outcome) in pulls {
        match outcome {
            PullOutcome::Skipped => println!("-  '{namespace}' skipped (no source directory)"),
            PullOutcome::Synced(report) => {
                println!(
                    "✓ '{namespace}' pulled ({} loaded, {} published, {} discarded)",
                    report.materialized.len(),
                    report.published.len(),
                    report.discarded.len(),
                );
                for name in &report.published {
                    println!("  ↑  {name}");
                }
                for name in &report.skipped {
                    println!("  !  {name} (not a valid artifact name, left unlogged)");
                }
            }
        }
    }
}
