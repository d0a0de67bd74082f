//! Error types for migrasync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or saving the project config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, unreadable directory, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No `migrasync.yaml` at the given path or any ancestor.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// The file parsed but describes an unusable project.
    #[error("invalid config: {0}")]
    Invalid(String),
}
