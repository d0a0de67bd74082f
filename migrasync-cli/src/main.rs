//! migrasync: keep migration artifacts in step between a log table and
//! each instance's filesystem.
//!
//! # Usage
//!
//! ```text
//! migrasync init [DIR]
//! migrasync pull [NAMESPACE...]
//! migrasync generate [NAMESPACE...]
//! migrasync migrate [NAMESPACE [TARGET]] [--database ALIAS] [--fake] [--fake-initial]
//! migrasync status [--namespace <name>] [--json]
//! migrasync diff <namespace>
//! ```
//!
//! Every command except `init` reads `migrasync.yaml`, found by walking up
//! from the current directory unless `--config` names it.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, generate::GenerateArgs, init::InitArgs, migrate::MigrateArgs, pull::PullArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "migrasync",
    version,
    about = "Synchronize migration artifacts between a database log and the filesystem",
    long_about = None,
)]
struct Cli {
    /// Path to migrasync.yaml (default: search upward from the current dir).
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold migrasync.yaml and create the log table.
    Init(InitArgs),

    /// Load artifacts from the log into each namespace directory.
    Pull(PullArgs),

    /// Pull, run the generator, and publish what it produces.
    Generate(GenerateArgs),

    /// Generate, pull again, then run the applier.
    Migrate(MigrateArgs),

    /// Compare artifact directories with the log.
    Status(StatusArgs),

    /// Show unified diffs for drifted artifacts of a namespace.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Pull(args) => args.run(config),
        Commands::Generate(args) => args.run(config),
        Commands::Migrate(args) => args.run(config),
        Commands::Status(args) => args.run(config),
        Commands::Diff(args) => args.run(config),
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
