use crate::concurrency::shutdown_requested;
use crate::config::SdkpinConfig;
use crate::managed::ManagedSet;
use crate::repair::{find_missing, promote, prune, sync_from_app, CatalogEdit, MissingEntry};
use crate::repair::{PromoteOutcome, SyncOutcome};
use crate::report::Report;
use crate::usage::classification_targets;
use crate::validate::{validate, ValidationContext};
use crate::CoreError;
use sdkpin_oracle::{
    authority_candidates, find_sdk_app, load_authority_list, Classification, CommandProbe,
    ManagedOracle, OracleOptions, ProbeRunner, SdkApp,
};
use sdkpin_schema::{classify_version, DependencySlot, ReferenceKind};
use sdkpin_workspace::{
    detect_changed_manifests, ChangeSignal, LoadedWorkspace, ManifestRepository, WorkspaceLayout,
    WorkspaceError, WorkspaceLock,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const RUNTIME: &[DependencySlot] = &[DependencySlot::Dependencies];
const RUNTIME_AND_DEV: &[DependencySlot] =
    &[DependencySlot::Dependencies, DependencySlot::DevDependencies];

/// Result of a validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub app: SdkApp,
    /// Authority list used, if any; otherwise packages were probed.
    pub authority: Option<PathBuf>,
    pub report: Report,
}

/// Which manifests write-back touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub written: Vec<String>,
    pub dry_run: bool,
    /// Write-back stopped early on a shutdown request.
    pub interrupted: bool,
}

/// A repair's changes plus what was persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome<T> {
    pub changes: T,
    pub write: WriteSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixChanges {
    pub promote: PromoteOutcome,
    pub pruned: Vec<CatalogEdit>,
}

/// How restore chose the manifests it scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum RestoreScope {
    /// Manifests git reports as changed.
    Changed,
    /// Git was unavailable; the configured fallback list (or every member) was used.
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub scope: RestoreScope,
    pub scanned: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<SyncOutcome>,
    pub promote: PromoteOutcome,
}

/// Orchestrates load, classify, validate, repair and write-back for one
/// workspace root.
pub struct Engine {
    repo: ManifestRepository,
    config: SdkpinConfig,
    probe: Option<Arc<dyn ProbeRunner>>,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>, config: SdkpinConfig) -> Self {
        Self {
            repo: ManifestRepository::new(WorkspaceLayout::new(root)),
            config,
            probe: None,
        }
    }

    /// Replace the configured probe command.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ProbeRunner>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn root(&self) -> &Path {
        self.repo.layout().root()
    }

    pub fn config(&self) -> &SdkpinConfig {
        &self.config
    }

    pub fn load(&self) -> Result<LoadedWorkspace, CoreError> {
        Ok(self.repo.load_workspace()?)
    }

    pub fn locate_app(&self, ws: &LoadedWorkspace) -> Result<SdkApp, CoreError> {
        find_sdk_app(&ws.members, &self.config.sdk_package)
            .ok_or_else(|| CoreError::NoSdkApp(self.config.sdk_package.clone()))
    }

    pub fn oracle(&self, app: SdkApp) -> Result<ManagedOracle, CoreError> {
        let candidates = authority_candidates(
            app.dir(),
            self.root(),
            &self.config.sdk_package,
            &self.config.authority_file,
        );
        let authority = load_authority_list(&candidates);
        let probe: Arc<dyn ProbeRunner> = match &self.probe {
            Some(p) => Arc::clone(p),
            None => Arc::new(CommandProbe::new(
                self.config.probe.command.clone(),
                self.config.probe.timeout(),
            )?),
        };
        Ok(ManagedOracle::new(
            app,
            authority,
            probe,
            OracleOptions {
                concurrency: self.config.probe.concurrency,
            },
        )?)
    }

    fn classify(oracle: &ManagedOracle, targets: BTreeSet<String>) -> ManagedSet {
        debug!("classifying {} package(s)", targets.len());
        ManagedSet::new(oracle.classify_all(targets))
    }

    /// Evaluate every rule over the workspace.
    pub fn check(&self) -> Result<CheckOutcome, CoreError> {
        let ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let oracle = self.oracle(app.clone())?;
        let managed = Self::classify(&oracle, classification_targets(&ws));
        let diagnostics = validate(
            &ws,
            &ValidationContext {
                app_manifest: Some(&app.manifest_rel_path),
                managed: &managed,
                typings_prefixes: &self.config.typings_prefixes,
            },
        );
        let report = Report::new(diagnostics);
        info!(
            "{} error(s), {} warning(s), {} ok",
            report.summary.errors, report.summary.warnings, report.summary.ok
        );
        Ok(CheckOutcome {
            authority: oracle.authority().map(|a| a.path.clone()),
            app,
            report,
        })
    }

    pub fn promote(&self, dry_run: bool) -> Result<RepairOutcome<PromoteOutcome>, CoreError> {
        let mut ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let targets = concrete_targets(&ws, Some(&app.manifest_rel_path), None, RUNTIME);
        let managed = Self::classify(&self.oracle(app.clone())?, targets);
        let changes = promote(&mut ws, Some(&app.manifest_rel_path), &managed, None);
        let write = self.commit(&mut ws, dry_run)?;
        Ok(RepairOutcome { changes, write })
    }

    /// Drop unreferenced catalog entries. Needs neither the app nor the oracle.
    pub fn prune(&self, dry_run: bool) -> Result<RepairOutcome<Vec<CatalogEdit>>, CoreError> {
        let mut ws = self.load()?;
        let changes = prune(&mut ws);
        let write = self.commit(&mut ws, dry_run)?;
        Ok(RepairOutcome { changes, write })
    }

    /// Promote then prune, persisted together.
    pub fn fix(&self, dry_run: bool) -> Result<RepairOutcome<FixChanges>, CoreError> {
        let mut ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let targets = concrete_targets(&ws, Some(&app.manifest_rel_path), None, RUNTIME);
        let managed = Self::classify(&self.oracle(app.clone())?, targets);
        let promote = promote(&mut ws, Some(&app.manifest_rel_path), &managed, None);
        let pruned = prune(&mut ws);
        let write = self.commit(&mut ws, dry_run)?;
        Ok(RepairOutcome {
            changes: FixChanges { promote, pruned },
            write,
        })
    }

    /// Copy the app's managed concrete versions into the catalog.
    pub fn sync(&self, dry_run: bool) -> Result<RepairOutcome<SyncOutcome>, CoreError> {
        let mut ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let targets = app_targets(&ws, &app.manifest_rel_path);
        let managed = Self::classify(&self.oracle(app.clone())?, targets);
        let changes = sync_from_app(&mut ws, &app.manifest_rel_path, &managed);
        let write = self.commit(&mut ws, dry_run)?;
        Ok(RepairOutcome { changes, write })
    }

    pub fn missing(&self) -> Result<Vec<MissingEntry>, CoreError> {
        let ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let targets = concrete_targets(&ws, Some(&app.manifest_rel_path), None, RUNTIME_AND_DEV);
        let managed = Self::classify(&self.oracle(app.clone())?, targets);
        Ok(find_missing(&ws, Some(&app.manifest_rel_path), &managed))
    }

    /// Classify `packages`, or every package the workspace uses when empty.
    pub fn managed(
        &self,
        packages: &[String],
    ) -> Result<BTreeMap<String, Classification>, CoreError> {
        let ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let targets: BTreeSet<String> = if packages.is_empty() {
            classification_targets(&ws)
        } else {
            packages.iter().cloned().collect()
        };
        Ok(Self::classify(&self.oracle(app)?, targets).into_inner())
    }

    /// Re-apply catalog conventions to manifests an external tool changed.
    ///
    /// Only manifests in the restore scope are promoted, and only packages
    /// they declare are classified. When the app manifest is in scope the
    /// catalog is first synchronized from it.
    pub fn restore(&self, dry_run: bool) -> Result<RepairOutcome<RestoreOutcome>, CoreError> {
        let mut ws = self.load()?;
        let app = self.locate_app(&ws)?;
        let (scope, scanned) = self.restore_scope(&ws);

        if scanned.is_empty() {
            info!("no changed manifests; nothing to restore");
            return Ok(RepairOutcome {
                changes: RestoreOutcome {
                    scope,
                    scanned: Vec::new(),
                    synced: None,
                    promote: PromoteOutcome::default(),
                },
                write: WriteSummary {
                    dry_run,
                    ..WriteSummary::default()
                },
            });
        }

        let app_rel = app.manifest_rel_path.clone();
        let app_changed = scanned.contains(&app_rel);
        let mut targets = concrete_targets(&ws, Some(&app_rel), Some(&scanned), RUNTIME);
        if app_changed {
            targets.extend(app_targets(&ws, &app_rel));
        }
        let managed = Self::classify(&self.oracle(app)?, targets);

        let synced = app_changed.then(|| sync_from_app(&mut ws, &app_rel, &managed));
        let promote = promote(&mut ws, Some(&app_rel), &managed, Some(&scanned));
        let write = self.commit(&mut ws, dry_run)?;
        Ok(RepairOutcome {
            changes: RestoreOutcome {
                scope,
                scanned: scanned.into_iter().collect(),
                synced,
                promote,
            },
            write,
        })
    }

    fn restore_scope(&self, ws: &LoadedWorkspace) -> (RestoreScope, BTreeSet<String>) {
        match detect_changed_manifests(self.root()) {
            ChangeSignal::Detected(paths) => {
                let layout = self.repo.layout();
                let rels = paths.iter().map(|p| layout.relative(p)).collect();
                (RestoreScope::Changed, rels)
            }
            ChangeSignal::Unavailable(reason) => {
                warn!("change detection unavailable ({reason}); using fallback manifests");
                let fallback = &self.config.restore.fallback_manifests;
                let rels = if fallback.is_empty() {
                    ws.members.iter().map(|m| m.rel_path.clone()).collect()
                } else {
                    fallback
                        .iter()
                        .map(|p| p.trim_start_matches("./").to_owned())
                        .collect()
                };
                (RestoreScope::Fallback { reason }, rels)
            }
        }
    }

    /// Persist modified manifests one at a time under the workspace lock.
    ///
    /// The root manifest goes first so new catalog entries exist before any
    /// member refers to them. A write failure aborts; manifests already
    /// written stay written.
    pub fn commit(
        &self,
        ws: &mut LoadedWorkspace,
        dry_run: bool,
    ) -> Result<WriteSummary, CoreError> {
        let mut summary = WriteSummary {
            dry_run,
            ..WriteSummary::default()
        };
        if dry_run {
            summary.written = std::iter::once(&ws.root)
                .chain(&ws.members)
                .filter(|e| e.manifest.is_modified())
                .map(|e| e.rel_path.clone())
                .collect();
            return Ok(summary);
        }

        let lock_path = self.repo.layout().lock_file();
        let Some(_lock) = WorkspaceLock::try_acquire(&lock_path)? else {
            return Err(WorkspaceError::LockFailed(format!(
                "{} is held by another sdkpin run",
                lock_path.display()
            ))
            .into());
        };
        for entry in std::iter::once(&mut ws.root).chain(ws.members.iter_mut()) {
            if !entry.manifest.is_modified() {
                continue;
            }
            if shutdown_requested() {
                warn!("shutdown requested; {} not written", entry.rel_path);
                summary.interrupted = true;
                break;
            }
            if self.repo.save(entry)? {
                summary.written.push(entry.rel_path.clone());
            }
        }
        Ok(summary)
    }
}

/// Packages declared with concrete versions in `slots` by non-app members,
/// optionally limited to `scope`.
fn concrete_targets(
    ws: &LoadedWorkspace,
    app_manifest: Option<&str>,
    scope: Option<&BTreeSet<String>>,
    slots: &[DependencySlot],
) -> BTreeSet<String> {
    ws.members
        .iter()
        .filter(|m| Some(m.rel_path.as_str()) != app_manifest)
        .filter(|m| match scope {
            Some(s) => s.contains(&m.rel_path),
            None => true,
        })
        .flat_map(|m| {
            slots.iter().flat_map(move |slot| {
                m.manifest
                    .dependencies(*slot)
                    .iter()
                    .filter(|(_, v)| classify_version(v).kind() == ReferenceKind::Concrete)
                    .map(|(p, _)| p.clone())
            })
        })
        .collect()
}

/// Packages the app declares concretely in `dependencies` or `devDependencies`.
fn app_targets(ws: &LoadedWorkspace, app_manifest: &str) -> BTreeSet<String> {
    ws.member(app_manifest)
        .map(|app| {
            RUNTIME_AND_DEV
                .iter()
                .flat_map(|slot| app.manifest.dependencies(*slot).iter())
                .filter(|(_, v)| classify_version(v).kind() == ReferenceKind::Concrete)
                .map(|(p, _)| p.clone())
                .collect()
        })
        .unwrap_or_default()
}
