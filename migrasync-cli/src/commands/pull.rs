//! `migrasync pull`: the pull phase on its own.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use migrasync_sync::SyncScope;

use super::{namespace_names, open_orchestrator, print_bootstrap, print_pulls};

/// Arguments for `migrasync pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Namespaces to pull (default: all).
    pub namespaces: Vec<String>,
}

impl PullArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let mut orch = open_orchestrator(config)?;
        print_bootstrap(&orch.bootstrap());

        let scope = SyncScope::from_names(namespace_names(&self.namespaces));
        let pulls = orch.pull(&scope).context("pull failed")?;
        if pulls.is_empty() {
            println!("No managed namespaces to pull.");
        }
        print_pulls(&pulls);
        Ok(())
    }
}
