//! Project config (`migrasync.yaml`).
//!
//! # Layout
//!
//! ```text
//! <project>/
//!   migrasync.yaml           (this file)
//!   migrasync.sqlite3        (artifact log, path set by `database:`)
//!   apps/<namespace>/
//!     migrations/            (artifact directory, name set by `layout.dir_name`)
//! ```
//!
//! Relative paths inside the file are resolved against the directory that
//! holds it, so the same file works from any working directory.
//!
//! # API pattern
//!
//! Every function takes an explicit path (`_at`); the CLI decides where the
//! file lives via [`discover_from`] or `--config`.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;
use crate::types::{default_table, ArtifactLayout, ProjectConfig};

/// File name looked up by [`discover_from`].
pub const CONFIG_FILE_NAME: &str = "migrasync.yaml";

/// Current schema version written by [`init_at`].
pub const CONFIG_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<dir>/migrasync.yaml`: pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Walk from `start` up through its ancestors and return the first
/// `migrasync.yaml` found.
pub fn discover_from(start: &Path) -> Result<PathBuf, ConfigError> {
    for dir in start.ancestors() {
        let candidate = config_path_at(dir);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(ConfigError::NotFound {
        path: config_path_at(start),
    })
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load, validate and resolve the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML,
/// `ConfigError::Invalid` if the content fails validation.
pub fn load_at(path: &Path) -> Result<ProjectConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;

    let base = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let base = if base.is_absolute() {
        base
    } else {
        std::env::current_dir()?.join(base)
    };
    Ok(resolve_paths(config, &base))
}

/// Make every relative path in `config` absolute against `base`.
pub fn resolve_paths(mut config: ProjectConfig, base: &Path) -> ProjectConfig {
    config.project_root = resolve(base, &config.project_root);
    config.database = resolve(base, &config.database);
    for ns in &mut config.namespaces {
        ns.source_dir = resolve(base, &ns.source_dir);
    }
    config
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    // Drop `.` components so `<base>/./apps` prints as `<base>/apps`.
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

// ---------------------------------------------------------------------------
// 3. Validation
// ---------------------------------------------------------------------------

/// Reject configs the engine cannot operate on.
pub fn validate(config: &ProjectConfig) -> Result<(), ConfigError> {
    if !is_sql_identifier(&config.table) {
        return Err(ConfigError::Invalid(format!(
            "table name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
            config.table
        )));
    }
    if config.layout.dir_name.is_empty() {
        return Err(ConfigError::Invalid("layout.dir_name must not be empty".into()));
    }

    let mut seen = HashSet::new();
    for ns in &config.namespaces {
        if ns.name.0.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace names must not be empty".into()));
        }
        if !seen.insert(ns.name.0.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "namespace '{}' is declared more than once",
                ns.name
            )));
        }
    }
    Ok(())
}

/// `[A-Za-z_][A-Za-z0-9_]*`: table and index names are interpolated into DDL.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`.
pub fn save_at(path: &Path, config: &ProjectConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. Init
// ---------------------------------------------------------------------------

/// Scaffold `<dir>/migrasync.yaml` with an empty namespace list.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_at(dir: &Path) -> Result<(PathBuf, ProjectConfig), ConfigError> {
    let path = config_path_at(dir);
    if !path.exists() {
        let scaffold = ProjectConfig {
            version: CONFIG_VERSION,
            project_root: PathBuf::from("."),
            database: PathBuf::from("migrasync.sqlite3"),
            table: default_table(),
            busy_timeout_ms: 5_000,
            layout: ArtifactLayout::default(),
            namespaces: vec![],
            generator: None,
            applier: None,
        };
        save_at(&path, &scaffold)?;
    }
    let config = load_at(&path)?;
    Ok((path, config))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
