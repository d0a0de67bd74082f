//! Error types for migrasync-sync.

use std::path::PathBuf;

use thiserror::Error;

use migrasync_core::{ConfigError, NamespaceName};
use migrasync_store::StoreError;

use crate::collaborator::CollaboratorError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the artifact log.
    #[error("artifact log error: {0}")]
    Store(#[from] StoreError),

    /// An error from the project config.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any failure while handling one namespace, tagged with that namespace.
    #[error("namespace '{namespace}': {source}")]
    Namespace {
        namespace: NamespaceName,
        #[source]
        source: Box<SyncError>,
    },

    /// The scope named a namespace absent from the config.
    #[error("unknown namespace '{0}'")]
    UnknownNamespace(NamespaceName),

    /// Candidates were produced for a namespace whose source dir is missing.
    #[error("namespace '{0}' has no resolvable artifact directory")]
    NoArtifactDir(NamespaceName),

    /// Artifact names are bare file names.
    #[error("invalid artifact name '{0}'")]
    InvalidArtifactName(String),

    /// The generator collaborator failed.
    #[error("generator failed: {0}")]
    Generate(#[source] CollaboratorError),

    /// The apply collaborator failed; passed through as-is.
    #[error(transparent)]
    Apply(CollaboratorError),
}

impl SyncError {
    /// Attach namespace context unless it is already there.
    pub fn in_namespace(self, namespace: &NamespaceName) -> SyncError {
        match self {
            already @ SyncError::Namespace { .. } => already,
            other => SyncError::Namespace {
                namespace: namespace.clone(),
                source: Box::new(other),
            },
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
