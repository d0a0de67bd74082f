//! Namespace gate: which namespaces take part in log-backed sync.
//!
//! A namespace is managed only when its `source_dir` lies inside the project
//! root. Everything else (vendored or third-party code) is passed through
//! to the generator and applier untouched.

use std::path::{Component, Path, PathBuf};

use crate::types::Namespace;

/// True when `path` is `root` or lies underneath it.
///
/// Both paths must be absolute; a relative argument is never contained.
/// Comparison is component-wise after lexical normalization, so
/// `/srv/app/../app/x` is inside `/srv/app` and `/srv/app2` is not.
pub fn is_within(root: &Path, path: &Path) -> bool {
    if !root.is_absolute() || !path.is_absolute() {
        return false;
    }
    normalize(path).starts_with(normalize(root))
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Decides managed/unmanaged for every namespace of one project.
#[derive(Debug, Clone)]
pub struct NamespaceGate {
    root: PathBuf,
}

impl NamespaceGate {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths that exist are canonicalized first so symlinked checkouts compare
    /// by their real location. Resolution failures fall back to the lexical
    /// form and never raise.
    pub fn is_managed(&self, namespace: &Namespace) -> bool {
        let root = canonical_or_lexical(&self.root);
        let source = canonical_or_lexical(&namespace.source_dir);
        is_within(&root, &source)
    }
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn canonical_or_lexical(path: &Path) -> PathBuf {
    let lexical = normalize(path);
    for prefix in lexical.ancestors() {
        if let Ok(real) = std::fs::canonicalize(prefix) {
            return match lexical.strip_prefix(prefix) {
                Ok(rest) if !rest.as_os_str().is_empty() => real.join(rest),
                _ => real,
            };
        }
    }
    lexical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamespaceName;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("/srv/app", "/srv/app", true)]
    #[case("/srv/app", "/srv/app/accounts", true)]
    #[case("/srv/app", "/srv/app/./accounts/../billing", true)]
    #[case("/srv/app", "/srv/app2/accounts", false)]
    #[case("/srv/app", "/srv", false)]
    #[case("/srv/app", "/srv/app/../other", false)]
    #[case("/srv/app", "/usr/lib/vendor/pkg", false)]
    #[case("/srv/app/", "/srv/app/accounts", true)]
    #[case("srv/app", "srv/app/accounts", false)]
    #[case("/srv/app", "accounts", false)]
    fn containment(#[case] root: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_within(Path::new(root), Path::new(path)), expected);
    }

    #[test]
    fn normalize_drops_dots() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }

    #[test]
    fn gate_manages_existing_child_dir() {
        let root = TempDir::new().unwrap();
        let child = root.path().join("accounts");
        std::fs::create_dir_all(&child).unwrap();
        let gate = NamespaceGate::new(root.path());
        let ns = Namespace {
            name: NamespaceName::from("accounts"),
            source_dir: child,
        };
        assert!(gate.is_managed(&ns));
    }

    #[test]
    fn gate_rejects_sibling_tree() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let gate = NamespaceGate::new(root.path());
        let ns = Namespace {
            name: NamespaceName::from("vendored"),
            source_dir: outside.path().to_path_buf(),
        };
        assert!(!gate.is_managed(&ns));
    }

    #[test]
    fn missing_dir_under_root_is_still_managed() {
        let root = TempDir::new().unwrap();
        let gate = NamespaceGate::new(root.path());
        let ns = Namespace {
            name: NamespaceName::from("later"),
            source_dir: root.path().join("not_yet"),
        };
        assert!(gate.is_managed(&ns));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_into_root_is_managed() {
        let root = TempDir::new().unwrap();
        let real = root.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        let elsewhere = TempDir::new().unwrap();
        let link = elsewhere.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let gate = NamespaceGate::new(root.path());
        let ns = Namespace {
            name: NamespaceName::from("linked"),
            source_dir: link,
        };
        assert!(gate.is_managed(&ns));
    }
}
