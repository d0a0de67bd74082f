//! Unified diffs between drifted files and their logged content, for
//! `migrasync diff`.
//!
//! The on-disk copy is the "a" side and the log is the "b" side, so the diff
//! reads as what the next pull will do to the file.

use std::path::PathBuf;

use similar::TextDiff;

use migrasync_core::{Namespace, NamespaceGate, NamespaceName, ProjectConfig};
use migrasync_store::LogStore;

use crate::error::{io_err, SyncError};
use crate::status::artifact_files;

/// A single drifted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDiff {
    pub name: String,
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Diff result for a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDiff {
    pub namespace: NamespaceName,
    /// Unmanaged or unresolved namespaces have nothing to compare.
    pub compared: bool,
    pub diffs: Vec<ArtifactDiff>,
}

/// Diff every logged artifact of `name` whose file content differs.
///
/// Missing and unpublished files are not diffed; `status` reports those.
pub fn diff_namespace(
    store: &LogStore,
    config: &ProjectConfig,
    gate: &NamespaceGate,
    name: &NamespaceName,
) -> Result<NamespaceDiff, SyncError> {
    let namespace = config
        .namespace(name)
        .ok_or_else(|| SyncError::UnknownNamespace(name.clone()))?;
    if !gate.is_managed(namespace) {
        return Ok(NamespaceDiff {
            namespace: name.clone(),
            compared: false,
            diffs: Vec::new(),
        });
    }
    diff_managed(store, config, namespace).map_err(|e| e.in_namespace(name))
}

fn diff_managed(
    store: &LogStore,
    config: &ProjectConfig,
    namespace: &Namespace,
) -> Result<NamespaceDiff, SyncError> {
    let Some(dir) = namespace.artifact_dir(&config.layout) else {
        return Ok(NamespaceDiff {
            namespace: namespace.name.clone(),
            compared: false,
            diffs: Vec::new(),
        });
    };

    let records = if store.table_exists()? {
        store.list_by_namespace(&namespace.name)?
    } else {
        Vec::new()
    };
    let on_disk = artifact_files(&dir, &config.layout)?;

    let mut diffs = Vec::new();
    for record in records {
        let Some(path) = on_disk.get(&record.name) else {
            continue;
        };
        let existing = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if existing == record.content {
            continue;
        }

        let relative = path
            .strip_prefix(&config.project_root)
            .unwrap_or(path.as_path());
        let old_header = format!("a/{}", relative.display());
        let new_header = format!("b/{}", relative.display());
        let unified = TextDiff::from_lines(&existing, &record.content)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(ArtifactDiff {
            name: record.name,
            path: path.clone(),
            unified_diff: unified,
        });
    }

    Ok(NamespaceDiff {
        namespace: namespace.name.clone(),
        compared: true,
        diffs,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use migrasync_core::ArtifactLayout;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, ProjectConfig, LogStore) {
        let root = TempDir::new().expect("root");
        let source_dir = root.path().join("accounts");
        fs::create_dir_all(source_dir.join("migrations")).expect("mkdir");
        let config = ProjectConfig {
            version: 1,
            project_root: root.path().to_path_buf(),
            database: root.path().join("db.sqlite3"),
            table: "migrations_log".to_string(),
            busy_timeout_ms: 1_000,
            layout: ArtifactLayout::default(),
            namespaces: vec![Namespace {
                name: NamespaceName::from("accounts"),
                source_dir,
            }],
            generator: None,
            applier: None,
        };
        let store = LogStore::open_in_memory("migrations_log").expect("open");
        store.ensure_table();
        (root, config, store)
    }

    #[test]
    fn drifted_file_produces_headed_diff() {
        let (root, config, mut store) = setup();
        let ns = NamespaceName::from("accounts");
        store
            .get_or_create(&ns, "0001_init", "create a;\ncreate b;\n", Utc::now())
            .expect("seed");
        fs::write(
            root.path().join("accounts/migrations/0001_init"),
            "create a;\ncreate c;\n",
        )
        .expect("drift");

        let gate = NamespaceGate::new(root.path());
        let diff = diff_namespace(&store, &config, &gate, &ns).expect("diff");
        assert!(diff.compared);
        assert_eq!(diff.diffs.len(), 1);
        let text = &diff.diffs[0].unified_diff;
        assert!(text.contains("--- a/accounts/migrations/0001_init"), "{text}");
        assert!(text.contains("+++ b/accounts/migrations/0001_init"), "{text}");
        assert!(text.contains("-create c;"));
        assert!(text.contains("+create b;"));
    }

    #[test]
    fn matching_and_missing_files_have_no_diff() {
        let (root, config, mut store) = setup();
        let ns = NamespaceName::from("accounts");
        store.get_or_create(&ns, "0001_init", "a", Utc::now()).expect("seed");
        store.get_or_create(&ns, "0002_more", "b", Utc::now()).expect("seed");
        fs::write(root.path().join("accounts/migrations/0001_init"), "a").expect("write");

        let gate = NamespaceGate::new(root.path());
        let diff = diff_namespace(&store, &config, &gate, &ns).expect("diff");
        assert!(diff.diffs.is_empty());
    }

    #[test]
    fn unknown_namespace_is_an_error() {
        let (root, config, store) = setup();
        let gate = NamespaceGate::new(root.path());
        let err = diff_namespace(&store, &config, &gate, &NamespaceName::from("nope")).unwrap_err();
        assert!(matches!(err, SyncError::UnknownNamespace(_)));
    }
}
