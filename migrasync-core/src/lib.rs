//! migrasync core library: domain types, project config, namespace gating.
//!
//! - [`types`]: newtypes, log records, config structs
//! - [`config`]: load / save / init of `migrasync.yaml`
//! - [`gate`]: path containment and the managed-namespace predicate
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod gate;
pub mod types;

pub use error::ConfigError;
pub use gate::NamespaceGate;
pub use types::{
    ArtifactLayout, ArtifactRecord, CandidateArtifact, CommandSpec, Namespace, NamespaceName,
    ProjectConfig,
};
