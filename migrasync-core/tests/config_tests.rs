//! Config error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use migrasync_core::{
    config,
    types::{NamespaceName, ProjectConfig},
    ConfigError, NamespaceGate,
};
use predicates::prelude::predicate;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = config::config_path_at(dir.path());
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config not found"));
    assert!(err.to_string().contains("migrasync.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("migrasync.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(&config::config_path_at(dir.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("migrasync.yaml"));
}

#[test]
fn missing_database_field_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("migrasync.yaml").write_str("version: 1\n").expect("write");

    let err = config::load_at(&config::config_path_at(dir.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn discover_without_config_reports_start_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let nested = dir.child("a/b");
    nested.create_dir_all().expect("mkdir");
    // The temp dir itself sits somewhere without a migrasync.yaml above it.
    match config::discover_from(nested.path()) {
        Err(ConfigError::NotFound { path }) => assert!(path.starts_with(nested.path())),
        Ok(found) => assert!(!found.starts_with(dir.path()), "unexpected: {}", found.display()),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 2. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_scaffold() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let (path, cfg) = config::init_at(dir.path()).expect("init");

    dir.child("migrasync.yaml").assert(predicate::path::exists());
    dir.child("migrasync.yaml.tmp").assert(predicate::path::missing());
    assert_eq!(path, dir.path().join("migrasync.yaml"));
    assert_eq!(cfg.version, config::CONFIG_VERSION);
    assert_eq!(cfg.database, dir.path().join("migrasync.sqlite3"));
    assert!(cfg.namespaces.is_empty());

    let raw = fs::read_to_string(&path).expect("read");
    let on_disk: ProjectConfig = serde_yaml::from_str(&raw).expect("roundtrip");
    assert_eq!(on_disk.database, std::path::PathBuf::from("migrasync.sqlite3"));
}

#[test]
fn init_is_idempotent() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("migrasync.yaml")
        .write_str(
            "version: 1\ndatabase: custom.sqlite3\nnamespaces:\n  - name: accounts\n    source_dir: apps/accounts\n",
        )
        .expect("write");

    let (_, cfg) = config::init_at(dir.path()).expect("init");
    assert_eq!(cfg.database, dir.path().join("custom.sqlite3"));
    assert_eq!(cfg.namespaces.len(), 1);
    assert_eq!(cfg.namespaces[0].name, NamespaceName::from("accounts"));
}

// ---------------------------------------------------------------------------
// 3. Gate over a loaded config
// ---------------------------------------------------------------------------

#[test]
fn gate_splits_loaded_namespaces() {
    let project = assert_fs::TempDir::new().expect("tempdir");
    let vendor = assert_fs::TempDir::new().expect("tempdir");
    project.child("apps/accounts").create_dir_all().expect("mkdir");

    let yaml = format!(
        "version: 1\ndatabase: db.sqlite3\nnamespaces:\n  - name: accounts\n    source_dir: apps/accounts\n  - name: vendored\n    source_dir: {}\n",
        vendor.path().display()
    );
    project.child("migrasync.yaml").write_str(&yaml).expect("write");

    let cfg = config::load_at(&config::config_path_at(project.path())).expect("load");
    let gate = NamespaceGate::new(&cfg.project_root);
    let managed: Vec<_> = cfg
        .namespaces
        .iter()
        .filter(|ns| gate.is_managed(ns))
        .map(|ns| ns.name.to_string())
        .collect();
    assert_eq!(managed, vec!["accounts".to_string()]);
}
