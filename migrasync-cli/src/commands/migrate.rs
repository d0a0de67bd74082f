//! `migrasync migrate`: synchronize and apply.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use migrasync_core::NamespaceName;
use migrasync_sync::{collaborator::DEFAULT_DATABASE_ALIAS, MigrateRequest};

use super::generate::print_generate;
use super::{configured_applier, generator_or_noop, open_orchestrator, print_pulls};

/// Arguments for `migrasync migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Restrict to one namespace.
    pub namespace: Option<String>,

    /// Artifact name to migrate the namespace to.
    #[arg(requires = "namespace")]
    pub target: Option<String>,

    /// Database alias handed to the applier.
    #[arg(long, default_value = DEFAULT_DATABASE_ALIAS)]
    pub database: String,

    /// Mark artifacts as applied without running them.
    #[arg(long)]
    pub fake: bool,

    /// Treat initial artifacts as applied when their tables already exist.
    #[arg(long)]
    pub fake_initial: bool,
}

impl MigrateArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let mut orch = open_orchestrator(config)?;
        let mut applier = configured_applier(orch.config())?;
        let mut generator = generator_or_noop(orch.config());

        let request = MigrateRequest {
            namespace: self.namespace.map(NamespaceName::from),
            target: self.target,
            database: self.database,
            fake: self.fake,
            fake_initial: self.fake_initial,
        };
        let report = orch
            .migrate(&request, generator.as_mut(), applier.as_mut())
            .context("migrate failed")?;

        print_generate(&report.generate);
        print_pulls(&report.pulls);
        println!("✓ applied (database '{}')", request.database);
        Ok(())
    }
}
