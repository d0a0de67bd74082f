//! Invocation sequencing shared by every CLI command.
//!
//! `generate`: bootstrap → pull (managed) → generator + push per candidate.
//! `migrate`: `generate` → pull again (managed) → apply.
//!
//! Everything before apply aborts the invocation on the first error, tagged
//! with the namespace. Apply errors come back untouched.

use std::time::Duration;

use migrasync_core::{Namespace, NamespaceGate, NamespaceName, ProjectConfig};
use migrasync_store::{BootstrapOutcome, LogStore};

use crate::collaborator::{Applier, ApplyRequest, Generator, DEFAULT_DATABASE_ALIAS};
use crate::reconciler::{pass_through, PullOutcome, PushOutcome, Reconciler};
use crate::SyncError;

/// Which configured namespaces an invocation touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Namespaces(Vec<NamespaceName>),
}

impl SyncScope {
    /// An empty list means every namespace.
    pub fn from_names(names: Vec<NamespaceName>) -> Self {
        if names.is_empty() {
            SyncScope::All
        } else {
            SyncScope::Namespaces(names)
        }
    }

    /// Resolve against `config`, in config order for `All` and in the given
    /// order otherwise.
    pub fn select<'c>(&self, config: &'c ProjectConfig) -> Result<Vec<&'c Namespace>, SyncError> {
        match self {
            SyncScope::All => Ok(config.namespaces.iter().collect()),
            SyncScope::Namespaces(names) => names
                .iter()
                .map(|name| {
                    config
                        .namespace(name)
                        .ok_or_else(|| SyncError::UnknownNamespace(name.clone()))
                })
                .collect(),
        }
    }
}

/// Inputs of `migrate`, mirroring the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateRequest {
    pub namespace: Option<NamespaceName>,
    pub target: Option<String>,
    pub database: String,
    pub fake: bool,
    pub fake_initial: bool,
}

impl Default for MigrateRequest {
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

impl MigrateRequest {
    fn scope(&self) -> SyncScope {
        match &self.namespace {
            Some(ns) => SyncScope::Namespaces(vec![ns.clone()]),
            None => SyncScope::All,
        }
    }

    fn apply_request(&self) -> ApplyRequest {
        ApplyRequest {
            namespace: self.namespace.clone(),
            target: self.target.clone(),
            database: self.database.clone(),
            fake: self.fake,
            fake_initial: self.fake_initial,
        }
    }
}

/// Generation results for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceGeneration {
    pub namespace: NamespaceName,
    pub managed: bool,
    pub outcomes: Vec<PushOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub bootstrap: BootstrapOutcome,
    pub pulls: Vec<(NamespaceName, PullOutcome)>,
    pub generated: Vec<NamespaceGeneration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateReport {
    pub generate: GenerateReport,
    pub pulls: Vec<(NamespaceName, PullOutcome)>,
}

/// Owns the config, the log and the gate for one invocation.
pub struct Orchestrator {
    config: ProjectConfig,
    store: LogStore,
    gate: NamespaceGate,
}

impl Orchestrator {
    pub fn new(config: ProjectConfig, store: LogStore) -> Self {
        let gate = NamespaceGate::new(&config.project_root);
        Self {
            config,
            store,
            gate,
        }
    }

    /// Open the log named by `config`.
    pub fn open(config: ProjectConfig) -> Result<Self, SyncError> {
        let store = LogStore::open(
            &config.database,
            &config.table,
            Duration::from_millis(config.busy_timeout_ms),
        )?;
        Ok(Self::new(config, store))
    }

    /// Open the log without creating or altering anything, for inspection.
    pub fn open_read_only(config: ProjectConfig) -> Result<Self, SyncError> {
        let store = LogStore::open_read_only(
            &config.database,
            &config.table,
            Duration::from_millis(config.busy_timeout_ms),
        )?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn gate(&self) -> &NamespaceGate {
        &self.gate
    }

    pub fn bootstrap(&self) -> BootstrapOutcome {
        self.store.ensure_table()
    }

    /// Pull phase over the managed namespaces of `scope`.
    pub fn pull(&mut self, scope: &SyncScope) -> Result<Vec<(NamespaceName, PullOutcome)>, SyncError> {
        let selected = scope.select(&self.config)?;
        let mut reconciler = Reconciler::new(&mut self.store, &self.config.layout);
        let mut pulls = Vec::new();
        for ns in selected {
            if !self.gate.is_managed(ns) {
                tracing::debug!("{} is outside the project root, not pulling", ns.name);
                continue;
            }
            pulls.push((ns.name.clone(), reconciler.pull_sync(ns)?));
        }
        Ok(pulls)
    }

    /// Bootstrap, pull, then run `generator` for every namespace in scope.
    ///
    /// Candidates of managed namespaces go through the push phase; those of
    /// unmanaged namespaces are written straight to disk.
    pub fn generate(
        &mut self,
        scope: &SyncScope,
        generator: &mut dyn Generator,
    ) -> Result<GenerateReport, SyncError> {
        let bootstrap = self.bootstrap();
        let pulls = self.pull(scope)?;

        let selected = scope.select(&self.config)?;
        let mut reconciler = Reconciler::new(&mut self.store, &self.config.layout);
        let mut generated = Vec::new();
        for ns in selected {
            let managed = self.gate.is_managed(ns);
            let Some(artifact_dir) = ns.artifact_dir(&self.config.layout) else {
                tracing::warn!("{}: source directory missing, skipping generation", ns.name);
                generated.push(NamespaceGeneration {
                    namespace: ns.name.clone(),
                    managed,
                    outcomes: Vec::new(),
                });
                continue;
            };
            let candidates = generator
                .generate(ns, Some(&artifact_dir))
                .map_err(|e| SyncError::Generate(e).in_namespace(&ns.name))?;
            if candidates.is_empty() {
                tracing::info!("{}: no changes detected", ns.name);
            }

            let mut outcomes = Vec::with_capacity(candidates.len());
            for candidate in &candidates {
                let outcome = if managed {
                    reconciler.push_sync(ns, candidate)?
                } else {
                    pass_through(ns, &self.config.layout, candidate)?
                };
                tracing::debug!("{} -> {}", outcome.path().display(), outcome.label());
                outcomes.push(outcome);
            }
            generated.push(NamespaceGeneration {
                namespace: ns.name.clone(),
                managed,
                outcomes,
            });
        }

        Ok(GenerateReport {
            bootstrap,
            pulls,
            generated,
        })
    }

    /// Full sequence: generate, pull again, apply.
    ///
    /// The second pull picks up records other processes published while this
    /// one was generating, so the applier reads a reconciled directory.
    pub fn migrate(
        &mut self,
        request: &MigrateRequest,
        generator: &mut dyn Generator,
        applier: &mut dyn Applier,
    ) -> Result<MigrateReport, SyncError> {
        let scope = request.scope();
        let generate = self.generate(&scope, generator)?;
        let pulls = self.pull(&scope)?;

        applier
            .apply(&request.apply_request())
            .map_err(SyncError::Apply)?;

        Ok(MigrateReport { generate, pulls })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
