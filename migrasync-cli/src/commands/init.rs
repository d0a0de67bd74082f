//! `migrasync init [DIR]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use migrasync_core::config;
use migrasync_store::LogStore;

use super::print_bootstrap;

/// Scaffold migrasync.yaml and create the log table.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let dir = self
            .dir
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.dir.display()))?;
        let (path, cfg) = config::init_at(&dir)
            .with_context(|| format!("failed to initialize '{}'", dir.display()))?;
        println!("✓ Config at {}", path.display());

        let store = LogStore::open(
            &cfg.database,
            &cfg.table,
            Duration::from_millis(cfg.busy_timeout_ms),
        )
        .with_context(|| format!("failed to open artifact log {}", cfg.database.display()))?;
        print_bootstrap(&store.ensure_table());
        println!("  Log table '{}' in {}", cfg.table, cfg.database.display());
        Ok(())
    }
}
