//! External collaborators: the artifact generator and the apply step.
//!
//! The engine only sees these traits. [`CommandGenerator`] and
//! [`CommandApplier`] back them with programs named in `migrasync.yaml`.
//!
//! # Generator protocol
//!
//! The program runs once per namespace in the project root with
//! `MIGRASYNC_NAMESPACE`, `MIGRASYNC_SOURCE_DIR` and (when resolvable)
//! `MIGRASYNC_ARTIFACT_DIR` set. It prints a JSON
//! array of `{"name": ..., "content": ...}` on stdout (empty output means no
//! new artifacts) and must not write artifact files itself.
//!
//! # Applier protocol
//!
//! `<program> <args...> [NAMESPACE [TARGET]] --database ALIAS [--fake] [--fake-initial]`
//! with stdio inherited.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use migrasync_core::{CandidateArtifact, CommandSpec, Namespace, NamespaceName};

/// Alias used when the caller names no database.
pub const DEFAULT_DATABASE_ALIAS: &str = "default";

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}{}", stderr_suffix(stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("'{program}' printed invalid artifact JSON: {source}")]
    Output {
        program: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Produces candidate artifacts from the current schema state.
pub trait Generator {
    /// Ordered candidates for `namespace`. `artifact_dir` is `None` when the
    /// namespace has no resolvable directory.
    fn generate(
        &mut self,
        namespace: &Namespace,
        artifact_dir: Option<&Path>,
    ) -> Result<Vec<CandidateArtifact>, CollaboratorError>;
}

/// Executes artifacts against a database.
pub trait Applier {
    fn apply(&mut self, request: &ApplyRequest) -> Result<(), CollaboratorError>;
}

/// Arguments forwarded verbatim to the apply step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub namespace: Option<NamespaceName>,
    /// Target artifact name to migrate to.
    pub target: Option<String>,
    pub database: String,
    /// Record artifacts as applied without executing them.
    pub fake: bool,
    /// Accept pre-existing matching state for initial artifacts.
    pub fake_initial: bool,
}

impl Default for ApplyRequest {
    fn default() -> Self {
        Self {
            namespace: None,
            target: None,
            database: DEFAULT_DATABASE_ALIAS.to_string(),
            fake: false,
            fake_initial: false,
        }
    }
}

impl ApplyRequest {
    /// Command-line arguments appended after the configured ones.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ns) = &self.namespace {
            args.push(ns.to_string());
            if let Some(target) = &self.target {
                args.push(target.clone());
            }
        }
        args.push("--database".to_string());
        args.push(self.database.clone());
        if self.fake {
            args.push("--fake".to_string());
        }
        if self.fake_initial {
            args.push("--fake-initial".to_string());
        }
        args
    }
}

/// Generator for projects without one: never proposes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGenerator;

impl Generator for NoGenerator {
    fn generate(
        &mut self,
        _namespace: &Namespace,
        _artifact_dir: Option<&Path>,
    ) -> Result<Vec<CandidateArtifact>, CollaboratorError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Command-backed implementations
// ---------------------------------------------------------------------------

/// Runs an external program per namespace and parses its stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    spec: CommandSpec,
    working_dir: PathBuf,
}

impl CommandGenerator {
    pub fn new(spec: CommandSpec, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            working_dir: working_dir.into(),
        }
    }
}

impl Generator for CommandGenerator {
    fn generate(
        &mut self,
        namespace: &Namespace,
        artifact_dir: Option<&Path>,
    ) -> Result<Vec<CandidateArtifact>, CollaboratorError> {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .current_dir(&self.working_dir)
            .env("MIGRASYNC_NAMESPACE", namespace.name.as_str())
            .env("MIGRASYNC_SOURCE_DIR", &namespace.source_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = artifact_dir {
            cmd.env("MIGRASYNC_ARTIFACT_DIR", dir);
        }

        tracing::debug!("running generator {} for {}", self.spec.program, namespace.name);
        let output = cmd.output().map_err(|e| CollaboratorError::Spawn {
            program: self.spec.program.clone(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                program: self.spec.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        parse_candidates(&self.spec.program, &output.stdout)
    }
}

fn parse_candidates(program: &str, stdout: &[u8]) -> Result<Vec<CandidateArtifact>, CollaboratorError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(stdout).map_err(|e| CollaboratorError::Output {
        program: program.to_string(),
        source: e,
    })
}

/// Runs an external program once with the apply arguments.
#[derive(Debug, Clone)]
pub struct CommandApplier {
    spec: CommandSpec,
    working_dir: PathBuf,
}

impl CommandApplier {
    pub fn new(spec: CommandSpec, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            working_dir: working_dir.into(),
        }
    }
}

impl Applier for CommandApplier {
    fn apply(&mut self, request: &ApplyRequest) -> Result<(), CollaboratorError> {
        let status = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .args(request.to_args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| CollaboratorError::Spawn {
                program: self.spec.program.clone(),
                source: e,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(CollaboratorError::Failed {
                program: self.spec.program.clone(),
                status,
                stderr: String::new(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ns(dir: &Path) -> Namespace {
        Namespace {
            name: NamespaceName::from("accounts"),
            source_dir: dir.to_path_buf(),
        }
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[test]
    fn apply_args_follow_protocol() {
        let request = ApplyRequest {
            namespace: Some(NamespaceName::from("accounts")),
            target: Some("0002_add_email".to_string()),
            database: "replica".to_string(),
            fake: true,
            fake_initial: true,
        };
        assert_eq!(
            request.to_args(),
            vec![
                "accounts",
                "0002_add_email",
                "--database",
                "replica",
                "--fake",
                "--fake-initial"
            ]
        );
        assert_eq!(ApplyRequest::default().to_args(), vec!["--database", "default"]);
    }

    #[test]
    fn target_without_namespace_is_dropped() {
        let request = ApplyRequest {
            target: Some("0002".to_string()),
            ..ApplyRequest::default()
        };
        assert_eq!(request.to_args(), vec!["--database", "default"]);
    }

    #[test]
    fn empty_stdout_means_no_candidates() {
        assert!(parse_candidates("gen", b"  \n").unwrap().is_empty());
    }

    #[test]
    fn bad_json_is_reported() {
        let err = parse_candidates("gen", b"{not json").unwrap_err();
        assert!(matches!(err, CollaboratorError::Output { .. }));
        assert!(err.to_string().contains("'gen'"));
    }

    #[test]
    #[cfg(unix)]
    fn command_generator_sees_namespace_env() {
        let tmp = TempDir::new().unwrap();
        let script = r#"printf '[{"name":"0001_%s","content":"body"}]' "$MIGRASYNC_NAMESPACE""#;
        let mut generator = CommandGenerator::new(sh(script), tmp.path());
        let out = generator.generate(&ns(tmp.path()), None).unwrap();
        assert_eq!(out, vec![CandidateArtifact::new("0001_accounts", "body")]);
    }

    #[test]
    #[cfg(unix)]
    fn command_generator_failure_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let mut generator = CommandGenerator::new(sh("echo 'model error' >&2; exit 3"), tmp.path());
        let err = generator.generate(&ns(tmp.path()), None).unwrap_err();
        match &err {
            CollaboratorError::Failed { stderr, .. } => assert!(stderr.contains("model error")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(err.to_string().contains("model error"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tmp = TempDir::new().unwrap();
        let spec = CommandSpec {
            program: "migrasync-definitely-not-installed".to_string(),
            args: vec![],
        };
        let err = CommandApplier::new(spec, tmp.path())
            .apply(&ApplyRequest::default())
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Spawn { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn command_applier_receives_arguments() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("args.txt");
        let script = format!("echo \"$@\" > '{}'", log.display());
        let spec = CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script, "apply".to_string()],
        };
        let request = ApplyRequest {
            namespace: Some(NamespaceName::from("billing")),
            fake: true,
            ..ApplyRequest::default()
        };
        CommandApplier::new(spec, tmp.path()).apply(&request).unwrap();
        let seen = std::fs::read_to_string(&log).unwrap();
        assert_eq!(seen.trim(), "billing --database default --fake");
    }
}
