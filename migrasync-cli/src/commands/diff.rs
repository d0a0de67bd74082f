//! `migrasync diff <namespace>`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use migrasync_core::NamespaceName;
use migrasync_sync::diff::diff_namespace;

use super::open_inspector;

/// Arguments for `migrasync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Namespace whose drifted artifacts to show.
    pub namespace: String,
}

impl DiffArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let orch = open_inspector(config)?;
        let name = NamespaceName::from(self.namespace.as_str());
        let result = diff_namespace(orch.store(), orch.config(), orch.gate(), &name)
            .with_context(|| format!("diff failed for '{name}'"))?;

        if !result.compared {
            println!("'{name}' is not managed; nothing to compare.");
            return Ok(());
        }
        if result.diffs.is_empty() {
            println!("No differences for '{name}'.");
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
