//! # migrasync-sync
//!
//! Directory reconciliation and invocation sequencing.
//!
//! Build an [`Orchestrator`] from a loaded config, then call
//! [`Orchestrator::generate`] or [`Orchestrator::migrate`]. The lower-level
//! [`Reconciler`] runs the pull and push phases for a single namespace.

pub mod collaborator;
pub mod diff;
pub mod error;
pub mod pipeline;
pub mod reconciler;
pub mod status;
pub mod writer;

pub use collaborator::{
    Applier, ApplyRequest, CollaboratorError, CommandApplier, CommandGenerator, Generator,
    NoGenerator,
};
pub use error::SyncError;
pub use pipeline::{GenerateReport, MigrateReport, MigrateRequest, Orchestrator, SyncScope};
pub use reconciler::{PullOutcome, PullReport, PushOutcome, Reconciler};
