//! Read-only comparison of artifact directories against the log.
//!
//! Per artifact, in precedence order:
//! 1. `Missing` (logged, no file on disk)
//! 2. `Unpublished` (file on disk, not logged)
//! 3. `Drifted` (SHA-256 of the file differs from the logged content)
//! 4. `InSync`
//!
//! Nothing is created, deleted or published. A log table that does not exist
//! yet reads as an empty log.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use migrasync_core::{ArtifactLayout, ArtifactRecord, Namespace, NamespaceGate, NamespaceName, ProjectConfig};
use migrasync_store::LogStore;

use crate::error::{io_err, SyncError};
use crate::pipeline::SyncScope;
use crate::writer::{check_artifact_name, is_temp_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactState {
    InSync,
    Missing,
    Drifted,
    Unpublished,
}

impl ArtifactState {
    pub fn label(self) -> &'static str {
        match self {
            ArtifactState::InSync => "in-sync",
            ArtifactState::Missing => "missing",
            ArtifactState::Drifted => "drifted",
            ArtifactState::Unpublished => "unpublished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub name: String,
    pub state: ArtifactState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_sha256: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceState {
    /// Source directory outside the project root.
    Unmanaged,
    /// Source directory missing.
    Unresolved,
    Tracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceStatus {
    pub namespace: NamespaceName,
    pub state: NamespaceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub artifacts: Vec<ArtifactStatus>,
}

impl NamespaceStatus {
    /// True when a pull would change nothing on disk.
    pub fn is_clean(&self) -> bool {
        self.artifacts.iter().all(|a| a.state == ArtifactState::InSync)
    }

    pub fn count(&self, state: ArtifactState) -> usize {
        self.artifacts.iter().filter(|a| a.state == state).count()
    }

    /// Most recent `published_at` among logged artifacts.
    pub fn last_published(&self) -> Option<DateTime<Utc>> {
        self.artifacts.iter().filter_map(|a| a.published_at).max()
    }
}

/// Status of every namespace in `scope`.
pub fn check_all(
    store: &LogStore,
    config: &ProjectConfig,
    gate: &NamespaceGate,
    scope: &SyncScope,
) -> Result<Vec<NamespaceStatus>, SyncError> {
    let table_present = store.table_exists()?;
    scope
        .select(config)?
        .into_iter()
        .map(|ns| -> Result<NamespaceStatus, SyncError> {
            if !gate.is_managed(ns) {
                return Ok(NamespaceStatus {
                    namespace: ns.name.clone(),
                    state: NamespaceState::Unmanaged,
                    dir: None,
                    artifacts: Vec::new(),
                });
            }
            let records = if table_present {
                store.list_by_namespace(&ns.name)?
            } else {
                Vec::new()
            };
            check(ns, &config.layout, &records).map_err(|e| e.in_namespace(&ns.name))
        })
        .collect()
}

/// Compare one managed namespace's directory with `records`.
pub fn check(
    namespace: &Namespace,
    layout: &ArtifactLayout,
    records: &[ArtifactRecord],
) -> Result<NamespaceStatus, SyncError> {
    let Some(dir) = namespace.artifact_dir(layout) else {
        return Ok(NamespaceStatus {
            namespace: namespace.name.clone(),
            state: NamespaceState::Unresolved,
            dir: None,
            artifacts: Vec::new(),
        });
    };

    let mut on_disk = artifact_files(&dir, layout)?;
    let mut artifacts = Vec::new();

    // Log order first, so the listing reads in materialization order.
    for record in records {
        if check_artifact_name(&record.name).is_err() {
            continue;
        }
        let log_hash = content_hash(&record.content);
        let (state, disk_hash) = match on_disk.remove(&record.name) {
            None => (ArtifactState::Missing, None),
            Some(path) => {
                let disk_hash = hash_file(&path)?;
                let state = if disk_hash == log_hash {
                    ArtifactState::InSync
                } else {
                    ArtifactState::Drifted
                };
                (state, Some(disk_hash))
            }
        };
        artifacts.push(ArtifactStatus {
            name: record.name.clone(),
            state,
            published_at: Some(record.published_at),
            log_sha256: Some(log_hash),
            disk_sha256: disk_hash,
        });
    }

    for (name, path) in on_disk {
        artifacts.push(ArtifactStatus {
            name,
            state: ArtifactState::Unpublished,
            published_at: None,
            log_sha256: None,
            disk_sha256: Some(hash_file(&path)?),
        });
    }

    Ok(NamespaceStatus {
        namespace: namespace.name.clone(),
        state: NamespaceState::Tracked,
        dir: Some(dir),
        artifacts,
    })
}

/// Hex SHA-256 of artifact content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn hash_file(path: &Path) -> Result<String, SyncError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Artifact files in `dir` keyed by name: no directories, markers, temp
/// files or names pull would leave alone. A missing directory has none.
pub(crate) fn artifact_files(
    dir: &Path,
    layout: &ArtifactLayout,
) -> Result<BTreeMap<String, PathBuf>, SyncError> {
    let mut files = BTreeMap::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(io_err(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if entry.file_type().map_err(|e| io_err(&path, e))?.is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!("ignoring non-UTF-8 file {}", path.display());
            continue;
        };
        if layout.is_marker(&name) || is_temp_file(&name) {
            continue;
        }
        if check_artifact_name(&name).is_err() {
            tracing::warn!("ignoring {}: not a valid artifact name", path.display());
            continue;
        }
        files.insert(name, path);
    }
    Ok(files)
}

/// Format age from a chrono timestamp.
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use migrasync_store::BootstrapOutcome;
    use tempfile::TempDir;

    fn record(name: &str, content: &str) -> ArtifactRecord {
        ArtifactRecord {
            namespace: NamespaceName::from("accounts"),
            name: name.to_string(),
            content: content.to_string(),
            published_at: Utc::now(),
        }
    }

    fn namespace(root: &Path) -> Namespace {
        Namespace {
            name: NamespaceName::from("accounts"),
            source_dir: root.join("accounts"),
        }
    }

    #[test]
    fn classifies_every_state() {
        let root = TempDir::new().expect("root");
        let ns = namespace(root.path());
        let dir = ns.source_dir.join("migrations");
        fs::create_dir_all(dir.join(".cache")).expect("mkdir");
        fs::write(dir.join(".keep"), "").expect("marker");
        fs::write(dir.join("0001_init"), "a").expect("write");
        fs::write(dir.join("0002_email"), "edited").expect("write");
        fs::write(dir.join("0004_local"), "new").expect("write");
        fs::write(dir.join("0005.migrasync.tmp"), "partial").expect("write");

        let records = vec![
            record("0001_init", "a"),
            record("0002_email", "b"),
            record("0003_index", "c"),
        ];
        let status = check(&ns, &ArtifactLayout::default(), &records).expect("check");

        let states: Vec<_> = status
            .artifacts
            .iter()
            .map(|a| (a.name.as_str(), a.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("0001_init", ArtifactState::InSync),
                ("0002_email", ArtifactState::Drifted),
                ("0003_index", ArtifactState::Missing),
                ("0004_local", ArtifactState::Unpublished),
            ]
        );
        assert!(!status.is_clean());
        assert_eq!(status.count(ArtifactState::Drifted), 1);
    }

    #[test]
    #[cfg(unix)]
    fn names_pull_would_skip_are_not_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = TempDir::new().expect("root");
        let ns = namespace(root.path());
        let dir = ns.source_dir.join("migrations");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("0001_init"), "a").expect("write");
        fs::write(dir.join("0002_a\\b"), "b").expect("write");
        fs::write(dir.join(OsStr::from_bytes(b"0003_\xff")), "c").expect("write");

        let records = vec![record("0001_init", "a"), record("../escape", "x")];
        let status = check(&ns, &ArtifactLayout::default(), &records).expect("check");
        let names: Vec<_> = status.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["0001_init"]);
        assert!(status.is_clean());
    }

    #[test]
    fn missing_source_dir_is_unresolved() {
        let root = TempDir::new().expect("root");
        let status = check(&namespace(root.path()), &ArtifactLayout::default(), &[]).expect("check");
        assert_eq!(status.state, NamespaceState::Unresolved);
    }

    #[test]
    fn missing_artifact_dir_reports_all_missing_without_creating_it() {
        let root = TempDir::new().expect("root");
        let ns = namespace(root.path());
        fs::create_dir_all(&ns.source_dir).expect("mkdir");
        let status =
            check(&ns, &ArtifactLayout::default(), &[record("0001_init", "a")]).expect("check");
        assert_eq!(status.artifacts[0].state, ArtifactState::Missing);
        assert!(!ns.source_dir.join("migrations").exists());
    }

    #[test]
    fn check_all_tolerates_missing_table_and_flags_unmanaged() {
        let root = TempDir::new().expect("root");
        let outside = TempDir::new().expect("outside");
        let ns = namespace(root.path());
        fs::create_dir_all(ns.source_dir.join("migrations")).expect("mkdir");
        fs::write(ns.source_dir.join("migrations/0001_init"), "a").expect("write");

        let config = ProjectConfig {
            version: 1,
            project_root: root.path().to_path_buf(),
            database: root.path().join("db.sqlite3"),
            table: "migrations_log".to_string(),
            busy_timeout_ms: 1_000,
            layout: ArtifactLayout::default(),
            namespaces: vec![
                ns.clone(),
                Namespace {
                    name: NamespaceName::from("vendored"),
                    source_dir: outside.path().to_path_buf(),
                },
            ],
            generator: None,
            applier: None,
        };
        let store = LogStore::open_in_memory("migrations_log").expect("open");
        let gate = NamespaceGate::new(root.path());

        let statuses = check_all(&store, &config, &gate, &SyncScope::All).expect("status");
        assert_eq!(statuses[0].artifacts[0].state, ArtifactState::Unpublished);
        assert_eq!(statuses[1].state, NamespaceState::Unmanaged);
        assert!(!store.table_exists().expect("exists"), "status must not bootstrap");
        assert_eq!(store.ensure_table(), BootstrapOutcome::Created);
    }

    #[test]
    fn hash_is_byte_exact() {
        assert_ne!(content_hash("a\r\n"), content_hash("a\n"));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn datetime_age_is_compact() {
        assert_eq!(format_datetime_age(Utc::now()), "0s");
        assert_eq!(format_datetime_age(Utc::now() - ChronoDuration::seconds(65)), "1m");
        assert_eq!(format_datetime_age(Utc::now() - ChronoDuration::days(3)), "3d");
    }

    #[test]
    fn state_serializes_kebab_case() {
        let json = serde_json::to_string(&ArtifactState::InSync).expect("json");
        assert_eq!(json, "\"in-sync\"");
    }
}
