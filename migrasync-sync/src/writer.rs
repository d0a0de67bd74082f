//! Artifact file writes.
//!
//! ## `write_artifact`: protocol
//!
//! 1. Ensure the parent directory exists.
//! 2. Write to `<path>.migrasync.tmp`.
//! 3. Rename to final path (atomic on POSIX).
//!
//! Content is written byte-for-byte; no line-ending normalisation, since the
//! on-disk copy must equal the logged record exactly.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Suffix of in-flight temporary files. Leftovers are removed on pull.
pub const TMP_SUFFIX: &str = ".migrasync.tmp";

/// True for names produced by an interrupted [`write_artifact`].
pub fn is_temp_file(file_name: &str) -> bool {
    file_name.ends_with(TMP_SUFFIX)
}

/// Reject anything that is not a bare file name.
pub fn check_artifact_name(name: &str) -> Result<(), SyncError> {
    let bare = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !is_temp_file(name);
    if bare {
        Ok(())
    } else {
        Err(SyncError::InvalidArtifactName(name.to_string()))
    }
}

/// Atomically write `content` to `path`, overwriting whatever is there.
pub fn write_artifact(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    write_with_tmp(path, content, &tmp)
}

fn write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

/// Create `dir` plus an empty `marker` file inside it if `dir` is missing.
///
/// Returns `true` when the directory was created by this call.
pub fn ensure_artifact_dir(dir: &Path, marker: &str) -> Result<bool, SyncError> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let marker_path = dir.join(marker);
    std::fs::write(&marker_path, "").map_err(|e| io_err(&marker_path, e))?;
    tracing::info!("created artifact directory {}", dir.display());
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn write_creates_file_and_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("apps").join("migrations").join("0001_init");
        write_artifact(&path, "create table t;").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "create table t;");
    }

    #[test]
    fn write_overwrites_and_keeps_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("0001_init");
        fs::write(&path, "drifted").unwrap();
        write_artifact(&path, "line1\r\nline2\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\r\nline2\n");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("0001_init");
        write_artifact(&path, "data").unwrap();
        let tmp_path = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
        assert!(!tmp_path.exists(), "{TMP_SUFFIX} must be cleaned up");
    }

    #[test]
    fn ensure_dir_creates_marker_once() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("migrations");
        assert!(ensure_artifact_dir(&dir, ".keep").unwrap());
        assert!(dir.join(".keep").is_file());
        fs::write(dir.join(".keep"), "kept").unwrap();
        assert!(!ensure_artifact_dir(&dir, ".keep").unwrap());
        assert_eq!(fs::read_to_string(dir.join(".keep")).unwrap(), "kept");
    }

    #[rstest]
    #[case("0001_init", true)]
    #[case("0002_add_email.sql", true)]
    #[case("", false)]
    #[case("..", false)]
    #[case("../escape", false)]
    #[case("nested/0001", false)]
    #[case("0001_init.migrasync.tmp", false)]
    fn artifact_names(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(check_artifact_name(name).is_ok(), ok);
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("0001_init");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("0001_init.migrasync.tmp");

        let result = write_with_tmp(&path, "new content", &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root ignores directory permissions; only assert when the rename failed.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp_path.exists(), "{TMP_SUFFIX} should be cleaned up");
        }
    }
}
