//! `migrasync generate`: generate and publish.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use migrasync_sync::{pipeline::GenerateReport, PushOutcome, SyncScope};

use super::{configured_generator, namespace_names, open_orchestrator, print_bootstrap, print_pulls};

/// Arguments for `migrasync generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Namespaces to generate for (default: all).
    pub namespaces: Vec<String>,
}

impl GenerateArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let mut orch = open_orchestrator(config)?;
        let mut generator = configured_generator(orch.config())
            .context("no generator configured in migrasync.yaml")?;

        let scope = SyncScope::from_names(namespace_names(&self.namespaces));
        let report = orch
            .generate(&scope, generator.as_mut())
            .context("generate failed")?;
        print_generate(&report);
        Ok(())
    }
}

pub fn print_generate(report: &GenerateReport) {
    print_bootstrap(&report.bootstrap);
    print_pulls(&report.pulls);
    for generation in &report.generated {
        if generation.outcomes.is_empty() {
            println!("·  '{}' no changes", generation.namespace);
            continue;
        }
        println!(
            "✓ '{}' generated {} artifact(s)",
            generation.namespace,
            generation.outcomes.len()
        );
        for outcome in &generation.outcomes {
            let symbol = match outcome {
                PushOutcome::Published { .. } => "✎",
                PushOutcome::PassedThrough { .. } => "→",
                PushOutcome::AlreadyOnDisk { .. } => "·",
                PushOutcome::Deferred { .. } => "⇄",
            };
            println!("  {symbol}  {} ({})", outcome.path().display(), outcome.label());
        }
    }
}
