//! Directory reconciler: keeps one namespace's artifact directory in step
//! with the log.
//!
//! ## Pull
//!
//! 1. Resolve `<source_dir>/<dir_name>`; skip if the source dir is missing.
//! 2. Create the directory and its marker if absent.
//! 3. Walk entries in name order. Marker files are kept, cache dirs and
//!    leftover temp files are removed, other directories are ignored.
//! 4. Files already in the log are deleted; unknown files are published.
//!    Names that are not valid UTF-8 bare file names stay on disk unlogged.
//! 5. Every logged record is written back, oldest first. Logged names that
//!    fail the same check are skipped.
//!
//! Step 4 deletes before step 5 rewrites. A failure in between leaves fewer
//! files than the log describes until the next pull.
//!
//! ## Push
//!
//! Existing file → nothing to do. Otherwise get-or-create inside one
//! transaction and, only when this call created the record, run the disk
//! write before committing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use migrasync_core::{ArtifactLayout, ArtifactRecord, CandidateArtifact, Namespace, NamespaceName};
use migrasync_store::LogStore;

use crate::error::{io_err, SyncError};
use crate::writer::{check_artifact_name, ensure_artifact_dir, is_temp_file, write_artifact};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one pull did to a namespace directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub namespace: NamespaceName,
    pub dir: PathBuf,
    /// The directory (and marker) did not exist before this pull.
    pub created_dir: bool,
    /// Stray files newly recorded in the log.
    pub published: Vec<String>,
    /// Files deleted because the log already had them.
    pub discarded: Vec<String>,
    /// Files written from the log, in materialization order.
    pub materialized: Vec<String>,
    /// Cache directories and temp files removed.
    pub purged: Vec<String>,
    /// Names that cannot be artifacts: left on disk, never logged or loaded.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No resolvable artifact directory.
    Skipped,
    Synced(PullReport),
}

/// Result of offering one candidate to the push phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A file was already at the target path; nothing published or written.
    AlreadyOnDisk { path: PathBuf },
    /// This call created the record and wrote the file.
    Published { path: PathBuf },
    /// Another writer owns the identity; the disk write was suppressed.
    Deferred { path: PathBuf, existing: ArtifactRecord },
    /// Unmanaged namespace: written without touching the log.
    PassedThrough { path: PathBuf },
}

impl PushOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PushOutcome::AlreadyOnDisk { path }
            | PushOutcome::Published { path }
            | PushOutcome::Deferred { path, .. }
            | PushOutcome::PassedThrough { path } => path,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PushOutcome::AlreadyOnDisk { .. } => "on-disk",
            PushOutcome::Published { .. } => "published",
            PushOutcome::Deferred { .. } => "deferred",
            PushOutcome::PassedThrough { .. } => "passed-through",
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Pull/push for namespaces sharing one log and one layout.
pub struct Reconciler<'a> {
    store: &'a mut LogStore,
    layout: &'a ArtifactLayout,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a mut LogStore, layout: &'a ArtifactLayout) -> Self {
        Self { store, layout }
    }

    /// Make `namespace`'s directory mirror the log.
    ///
    /// Errors carry the namespace.
    pub fn pull_sync(&mut self, namespace: &Namespace) -> Result<PullOutcome, SyncError> {
        self.pull_inner(namespace)
            .map_err(|e| e.in_namespace(&namespace.name))
    }

    fn pull_inner(&mut self, namespace: &Namespace) -> Result<PullOutcome, SyncError> {
        let Some(dir) = namespace.artifact_dir(self.layout) else {
            tracing::debug!("{}: no source directory, skipping pull", namespace.name);
            return Ok(PullOutcome::Skipped);
        };

        let created_dir = ensure_artifact_dir(&dir, &self.layout.marker_file)?;
        let mut report = PullReport {
            namespace: namespace.name.clone(),
            dir: dir.clone(),
            created_dir,
            published: Vec::new(),
            discarded: Vec::new(),
            materialized: Vec::new(),
            purged: Vec::new(),
            skipped: Vec::new(),
        };

        for entry in sorted_entries(&dir)? {
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    if !file_type.is_dir() {
                        tracing::warn!(
                            "{}: leaving non-UTF-8 file {} unpublished",
                            namespace.name,
                            path.display()
                        );
                        report.skipped.push(raw.to_string_lossy().into_owned());
                    }
                    continue;
                }
            };

            if file_type.is_dir() {
                if self.layout.is_cache_dir(&file_name) {
                    fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
                    tracing::debug!("removed cache dir {}", path.display());
                    report.purged.push(file_name);
                }
                continue;
            }
            if self.layout.is_marker(&file_name) {
                continue;
            }
            if is_temp_file(&file_name) {
                fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
                report.purged.push(file_name);
                continue;
            }
            if let Err(e) = check_artifact_name(&file_name) {
                tracing::warn!("{}: leaving {} unpublished: {e}", namespace.name, path.display());
                report.skipped.push(file_name);
                continue;
            }

            if self.store.exists(&namespace.name, &file_name)? {
                tracing::info!("cleaning {}.{}", namespace.name, file_name);
                fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
                report.discarded.push(file_name);
            } else {
                let content = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
                let (_, created) =
                    self.store
                        .get_or_create(&namespace.name, &file_name, &content, Utc::now())?;
                if created {
                    tracing::info!("saving {}.{}", namespace.name, file_name);
                    report.published.push(file_name);
                } else {
                    tracing::debug!("{}.{} logged concurrently", namespace.name, file_name);
                }
            }
        }

        for record in self.store.list_by_namespace(&namespace.name)? {
            if let Err(e) = check_artifact_name(&record.name) {
                tracing::warn!("{}: not loading logged record: {e}", namespace.name);
                report.skipped.push(record.name);
                continue;
            }
            tracing::info!("loading {}.{}", namespace.name, record.name);
            write_artifact(&dir.join(&record.name), &record.content)?;
            report.materialized.push(record.name);
        }

        Ok(PullOutcome::Synced(report))
    }

    /// Offer one generated artifact, writing it with [`write_artifact`].
    pub fn push_sync(
        &mut self,
        namespace: &Namespace,
        candidate: &CandidateArtifact,
    ) -> Result<PushOutcome, SyncError> {
        self.push_sync_with(namespace, candidate, write_artifact)
    }

    /// Offer one generated artifact; `write` runs only when this call is the
    /// publisher, inside the publishing transaction.
    pub fn push_sync_with<W>(
        &mut self,
        namespace: &Namespace,
        candidate: &CandidateArtifact,
        write: W,
    ) -> Result<PushOutcome, SyncError>
    where
        W: FnOnce(&Path, &str) -> Result<(), SyncError>,
    {
        self.push_inner(namespace, candidate, write)
            .map_err(|e| e.in_namespace(&namespace.name))
    }

    fn push_inner<W>(
        &mut self,
        namespace: &Namespace,
        candidate: &CandidateArtifact,
        write: W,
    ) -> Result<PushOutcome, SyncError>
    where
        W: FnOnce(&Path, &str) -> Result<(), SyncError>,
    {
        check_artifact_name(&candidate.name)?;
        let dir = namespace
            .artifact_dir(self.layout)
            .ok_or_else(|| SyncError::NoArtifactDir(namespace.name.clone()))?;
        ensure_artifact_dir(&dir, &self.layout.marker_file)?;

        let path = dir.join(&candidate.name);
        if path.exists() {
            tracing::debug!("{} already on disk, nothing to publish", path.display());
            return Ok(PushOutcome::AlreadyOnDisk { path });
        }

        let (record, created) = self.store.publish_with(
            &namespace.name,
            &candidate.name,
            &candidate.content,
            Utc::now(),
            |record: &ArtifactRecord| write(&path, &record.content),
        )?;

        if created {
            tracing::info!("saving {}.{}", namespace.name, candidate.name);
            Ok(PushOutcome::Published { path })
        } else {
            tracing::info!(
                "{}.{} already published elsewhere, deferring",
                namespace.name,
                candidate.name
            );
            Ok(PushOutcome::Deferred {
                path,
                existing: record,
            })
        }
    }
}

/// Write a candidate for a namespace the log does not manage.
pub fn pass_through(
    namespace: &Namespace,
    layout: &ArtifactLayout,
    candidate: &CandidateArtifact,
) -> Result<PushOutcome, SyncError> {
    write_unmanaged(namespace, layout, candidate).map_err(|e| e.in_namespace(&namespace.name))
}

fn write_unmanaged(
    namespace: &Namespace,
    layout: &ArtifactLayout,
    candidate: &CandidateArtifact,
) -> Result<PushOutcome, SyncError> {
    check_artifact_name(&candidate.name)?;
    let dir = namespace
        .artifact_dir(layout)
        .ok_or_else(|| SyncError::NoArtifactDir(namespace.name.clone()))?;
    let path = dir.join(&candidate.name);
    write_artifact(&path, &candidate.content)?;
    Ok(PushOutcome::PassedThrough { path })
}

fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, SyncError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        entries.push(entry.map_err(|e| io_err(dir, e))?);
    }
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
