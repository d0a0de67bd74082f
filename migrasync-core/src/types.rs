//! Domain types shared by the store, the reconciler and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Configuration types are serializable via serde + serde_yaml.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of an application/module group that owns its own artifact sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceName(pub String);

impl NamespaceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for NamespaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NamespaceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Log entities
// ---------------------------------------------------------------------------

/// One row of the artifact log. Created once per `(namespace, name)`, never
/// updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub namespace: NamespaceName,
    /// File name inside the namespace's artifact directory, e.g. `0001_init`.
    pub name: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

/// An artifact produced by the generator that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub name: String,
    pub content: String,
}

impl CandidateArtifact {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration structs
// ---------------------------------------------------------------------------

/// A namespace declared in the project config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: NamespaceName,
    /// Directory holding the namespace's sources. Relative paths in the YAML
    /// file are resolved against the config file's directory on load.
    pub source_dir: PathBuf,
}

impl Namespace {
    /// `<source_dir>/<layout.dir_name>` if the source directory exists.
    ///
    /// `None` means the namespace has no resolvable artifact directory.
    pub fn artifact_dir(&self, layout: &ArtifactLayout) -> Option<PathBuf> {
        if self.source_dir.is_dir() {
            Some(self.source_dir.join(&layout.dir_name))
        } else {
            None
        }
    }
}

/// How artifacts are laid out inside a namespace's source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    /// Sub-directory of each namespace's `source_dir` holding artifact files.
    pub dir_name: String,
    /// Placeholder created alongside a fresh artifact directory. Never treated
    /// as an artifact; neither is anything sharing its stem (`.keep.*`).
    pub marker_file: String,
    /// Build/cache directories that are removed on pull.
    pub cache_dirs: Vec<String>,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            dir_name: "migrations".to_string(),
            marker_file: ".keep".to_string(),
            cache_dirs: vec![".cache".to_string()],
        }
    }
}

impl ArtifactLayout {
    /// True for the marker file and any file sharing its stem.
    pub fn is_marker(&self, file_name: &str) -> bool {
        if file_name == self.marker_file {
            return true;
        }
        let stem = Path::new(&self.marker_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.marker_file.clone());
        file_name.starts_with(&format!("{stem}."))
    }

    pub fn is_cache_dir(&self, dir_name: &str) -> bool {
        self.cache_dirs.iter().any(|d| d == dir_name)
    }
}

/// An external program invoked as a collaborator (generator or applier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Root of `migrasync.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub version: u32,
    /// Namespaces whose `source_dir` lies under this root are managed.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// SQLite database holding the artifact log.
    pub database: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub layout: ArtifactLayout,
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applier: Option<CommandSpec>,
}

impl ProjectConfig {
    pub fn namespace(&self, name: &NamespaceName) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| &ns.name == name)
    }
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

pub(crate) fn default_table() -> String {
    "migrations_log".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
