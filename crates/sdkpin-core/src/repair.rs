//! Mechanical repairs. Every function mutates the loaded workspace in memory
//! only; persisting is the engine's job. Each repair is idempotent: applying it
//! to its own output changes nothing.

use crate::managed::ManagedSet;
use sdkpin_schema::{classify_version, DependencySlot, ReferenceKind, CATALOG_PROTOCOL};
use sdkpin_workspace::LoadedWorkspace;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A declaration whose version was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    pub manifest: String,
    pub package: String,
    pub slot: DependencySlot,
    pub from: String,
    pub to: String,
}

/// A catalog entry added or removed by a repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEdit {
    pub package: String,
    pub version: String,
}

/// A member declared a version different from the catalog entry that
/// already existed; the catalog entry was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogConflict {
    pub manifest: String,
    pub package: String,
    pub version: String,
    pub catalog_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromoteOutcome {
    pub rewrites: Vec<Rewrite>,
    pub added: Vec<CatalogEdit>,
    pub conflicts: Vec<CatalogConflict>,
}

impl PromoteOutcome {
    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty() && self.added.is_empty() && self.conflicts.is_empty()
    }
}

/// Convert concrete managed `dependencies` in non-app members to catalog
/// references, creating catalog entries as needed.
///
/// Members are visited in discovery order; the first concrete version seen
/// for a package becomes its catalog entry. When `scope` is given only those
/// manifests (by relative path) are touched.
pub fn promote(
    ws: &mut LoadedWorkspace,
    app_manifest: Option<&str>,
    managed: &ManagedSet,
    scope: Option<&BTreeSet<String>>,
) -> PromoteOutcome {
    let mut outcome = PromoteOutcome::default();

    for idx in 0..ws.members.len() {
        let member = &ws.members[idx];
        if Some(member.rel_path.as_str()) == app_manifest
            || scope.is_some_and(|s| !s.contains(&member.rel_path))
        {
            continue;
        }
        let candidates: Vec<(String, String)> = member
            .manifest
            .dependencies(DependencySlot::Dependencies)
            .iter()
            .filter(|(pkg, version)| {
                classify_version(version).kind() == ReferenceKind::Concrete
                    && managed.is_managed(pkg)
            })
            .map(|(pkg, version)| (pkg.clone(), version.clone()))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let rel_path = member.rel_path.clone();

        for (package, version) in candidates {
            let existing = ws.root.manifest.catalog_entry(&package).map(str::to_owned);
            match existing {
                None => {
                    ws.root.manifest.set_catalog_entry(&package, &version);
                    info!("catalog: added {package}@{version} (from {rel_path})");
                    outcome.added.push(CatalogEdit {
                        package: package.clone(),
                        version: version.clone(),
                    });
                }
                Some(existing) if existing != version => {
                    warn!(
                        "{rel_path}: {package}@{version} conflicts with catalog version {existing}; catalog kept"
                    );
                    outcome.conflicts.push(CatalogConflict {
                        manifest: rel_path.clone(),
                        package: package.clone(),
                        version: version.clone(),
                        catalog_version: existing,
                    });
                }
                Some(_) => {}
            }
            ws.members[idx].manifest.set_version(
                DependencySlot::Dependencies,
                &package,
                CATALOG_PROTOCOL,
            );
            outcome.rewrites.push(Rewrite {
                manifest: rel_path.clone(),
                package,
                slot: DependencySlot::Dependencies,
                from: version,
                to: CATALOG_PROTOCOL.to_owned(),
            });
        }
    }
    outcome
}

/// Remove catalog entries no manifest references through the catalog.
pub fn prune(ws: &mut LoadedWorkspace) -> Vec<CatalogEdit> {
    let referenced: BTreeSet<String> = std::iter::once(&ws.root)
        .chain(&ws.members)
        .flat_map(|e| e.manifest.declarations())
        .filter(|(_, _, version)| classify_version(version).kind() == ReferenceKind::Catalog)
        .map(|(_, package, _)| package.to_owned())
        .collect();
    let unused: Vec<String> = ws
        .root
        .manifest
        .catalog()
        .map(|c| {
            c.keys()
                .filter(|k| !referenced.contains(*k))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    unused
        .into_iter()
        .filter_map(|package| {
            let version = ws.root.manifest.remove_catalog_entry(&package)?;
            info!("catalog: removed unused {package}@{version}");
            Some(CatalogEdit { package, version })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Added,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncChange {
    pub package: String,
    pub action: SyncAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub changes: Vec<SyncChange>,
    /// Catalog entries the app does not declare. Reported, never removed.
    pub not_in_app: Vec<String>,
}

impl SyncOutcome {
    pub fn count(&self, action: SyncAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }
}

/// Make the catalog carry the app's concrete version of every managed
/// package it declares in `dependencies` or `devDependencies`.
pub fn sync_from_app(
    ws: &mut LoadedWorkspace,
    app_manifest: &str,
    managed: &ManagedSet,
) -> SyncOutcome {
    let Some(app) = ws.member(app_manifest) else {
        return SyncOutcome::default();
    };

    let mut declared = BTreeSet::new();
    let mut pins: BTreeMap<String, String> = BTreeMap::new();
    for slot in [DependencySlot::Dependencies, DependencySlot::DevDependencies] {
        for (package, version) in app.manifest.dependencies(slot) {
            declared.insert(package.clone());
            if classify_version(version).kind() == ReferenceKind::Concrete
                && managed.is_managed(package)
            {
                pins.entry(package.clone()).or_insert_with(|| version.clone());
            }
        }
    }

    let mut outcome = SyncOutcome::default();
    for (package, version) in pins {
        let previous = ws.root.manifest.set_catalog_entry(&package, &version);
        let (action, from) = match previous {
            None => (SyncAction::Added, None),
            Some(old) if old == version => (SyncAction::Unchanged, None),
            Some(old) => (SyncAction::Updated, Some(old)),
        };
        if action != SyncAction::Unchanged {
            info!("catalog: {package} -> {version}");
        }
        outcome.changes.push(SyncChange {
            package,
            action,
            from,
            to: version,
        });
    }

    if let Some(catalog) = ws.root.manifest.catalog() {
        outcome.not_in_app = catalog
            .keys()
            .filter(|k| !declared.contains(*k))
            .cloned()
            .collect();
    }
    outcome
}

/// A managed package declared concretely by members but absent from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub package: String,
    pub manifests: Vec<String>,
}

pub fn find_missing(
    ws: &LoadedWorkspace,
    app_manifest: Option<&str>,
    managed: &ManagedSet,
) -> Vec<MissingEntry> {
    let mut missing: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for member in &ws.members {
        if Some(member.rel_path.as_str()) == app_manifest {
            continue;
        }
        for slot in [DependencySlot::Dependencies, DependencySlot::DevDependencies] {
            for (package, version) in member.manifest.dependencies(slot) {
                if classify_version(version).kind() == ReferenceKind::Concrete
                    && managed.is_managed(package)
                    && ws.root.manifest.catalog_entry(package).is_none()
                {
                    missing
                        .entry(package.clone())
                        .or_default()
                        .insert(member.rel_path.clone());
                }
            }
        }
    }
    missing
        .into_iter()
        .map(|(package, manifests)| MissingEntry {
            package,
            manifests: manifests.into_iter().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::fixtures::workspace;

    const APP: &str = "apps/mobile/package.json";

    fn dep<'a>(ws: &'a LoadedWorkspace, rel: &str, package: &str) -> Option<&'a str> {
        ws.member(rel)?
            .manifest
            .dependencies(DependencySlot::Dependencies)
            .get(package)
            .map(String::as_str)
    }

    #[test]
    fn promote_rewrites_and_adds_entry() {
        let mut ws = workspace(
            r#"{"name":"root"}"#,
            &[
                (APP, r#"{"name":"mobile","dependencies":{"expo":"~52.0.0","date-fns":"3.0.0"}}"#),
                (
                    "packages/utils/package.json",
                    r#"{"name":"utils","dependencies":{"date-fns":"3.0.0","lodash":"4.17.21"}}"#,
                ),
            ],
        );
        let managed = ManagedSet::from_names(["date-fns", "expo"]);
        let out = promote(&mut ws, Some(APP), &managed, None);

        assert_eq!(out.rewrites.len(), 1);
        assert_eq!(out.added[0].version, "3.0.0");
        assert_eq!(dep(&ws, "packages/utils/package.json", "date-fns"), Some("catalog:"));
        assert_eq!(dep(&ws, "packages/utils/package.json", "lodash"), Some("4.17.21"));
        // The app keeps its concrete pin.
        assert_eq!(dep(&ws, APP, "date-fns"), Some("3.0.0"));
        assert_eq!(ws.root.manifest.catalog_entry("date-fns"), Some("3.0.0"));

        let again = promote(&mut ws, Some(APP), &managed, None);
        assert!(again.is_empty());
    }

    #[test]
    fn promote_first_writer_wins_and_reports_conflict() {
        let mut ws = workspace(
            r#"{"name":"root"}"#,
            &[
                ("packages/a/package.json", r#"{"name":"a","dependencies":{"react":"18.3.1"}}"#),
                ("packages/b/package.json", r#"{"name":"b","dependencies":{"react":"18.2.0"}}"#),
            ],
        );
        let out = promote(&mut ws, None, &ManagedSet::from_names(["react"]), None);
        assert_eq!(ws.root.manifest.catalog_entry("react"), Some("18.3.1"));
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].manifest, "packages/b/package.json");
        assert_eq!(out.conflicts[0].catalog_version, "18.3.1");
        assert_eq!(out.rewrites.len(), 2);
    }

    #[test]
    fn promote_respects_scope() {
        let mut ws = workspace(
            r#"{"name":"root"}"#,
            &[
                ("packages/a/package.json", r#"{"name":"a","dependencies":{"react":"18.3.1"}}"#),
                ("packages/b/package.json", r#"{"name":"b","dependencies":{"react":"18.3.1"}}"#),
            ],
        );
        let scope: BTreeSet<String> = ["packages/b/package.json".to_owned()].into();
        let out = promote(&mut ws, None, &ManagedSet::from_names(["react"]), Some(&scope));
        assert_eq!(out.rewrites.len(), 1);
        assert_eq!(dep(&ws, "packages/a/package.json", "react"), Some("18.3.1"));
        assert_eq!(dep(&ws, "packages/b/package.json", "react"), Some("catalog:"));
    }

    #[test]
    fn promote_ignores_dev_and_unmanaged() {
        let mut ws = workspace(
            r#"{"name":"root"}"#,
            &[(
                "packages/a/package.json",
                r#"{"name":"a","dependencies":{"zod":"3.23.8"},"devDependencies":{"react":"18.3.1"}}"#,
            )],
        );
        let out = promote(&mut ws, None, &ManagedSet::from_names(["react"]), None);
        assert!(out.is_empty());
        assert!(!ws.root.manifest.is_modified());
    }

    #[test]
    fn prune_removes_only_unreferenced_entries() {
        let mut ws = workspace(
            r#"{"name":"root","catalog":{"color":"4.2.3","react":"18.3.1","lodash":"4.17.21"}}"#,
            &[
                ("packages/a/package.json", r#"{"name":"a","dependencies":{"react":"catalog:"}}"#),
                ("packages/b/package.json", r#"{"name":"b","devDependencies":{"lodash":"catalog:"}}"#),
            ],
        );
        let removed = prune(&mut ws);
        assert_eq!(
            removed,
            vec![CatalogEdit {
                package: "color".to_owned(),
                version: "4.2.3".to_owned()
            }]
        );
        assert!(ws.root.manifest.catalog_entry("react").is_some());
        assert!(ws.root.manifest.catalog_entry("lodash").is_some());
        assert!(prune(&mut ws).is_empty());
    }

    #[test]
    fn sync_adds_updates_and_reports_extras() {
        let mut ws = workspace(
            r#"{"name":"root","catalog":{"react":"18.2.0","expo-font":"~13.0.1","zod":"3.23.8"}}"#,
            &[(
                APP,
                r#"{"name":"mobile","dependencies":{"expo":"~52.0.0","react":"18.3.1","expo-font":"~13.0.1","expo-image":"~2.0.0","ui":"workspace:*"}}"#,
            )],
        );
        let managed = ManagedSet::from_names(["expo", "react", "expo-font", "expo-image"]);
        let out = sync_from_app(&mut ws, APP, &managed);

        assert_eq!(out.count(SyncAction::Added), 2);
        assert_eq!(out.count(SyncAction::Updated), 1);
        assert_eq!(out.count(SyncAction::Unchanged), 1);
        let react = out.changes.iter().find(|c| c.package == "react").unwrap();
        assert_eq!(react.from.as_deref(), Some("18.2.0"));
        assert_eq!(ws.root.manifest.catalog_entry("react"), Some("18.3.1"));
        assert_eq!(out.not_in_app, vec!["zod"]);
        assert_eq!(ws.root.manifest.catalog_entry("zod"), Some("3.23.8"));
    }

    #[test]
    fn sync_without_changes_leaves_root_clean() {
        let mut ws = workspace(
            r#"{"name":"root","catalog":{"react":"18.3.1"}}"#,
            &[(APP, r#"{"name":"mobile","dependencies":{"react":"18.3.1"}}"#)],
        );
        let out = sync_from_app(&mut ws, APP, &ManagedSet::from_names(["react"]));
        assert_eq!(out.count(SyncAction::Unchanged), 1);
        assert!(!ws.root.manifest.is_modified());
    }

    #[test]
    fn missing_lists_uncatalogued_managed_packages() {
        let ws = workspace(
            r#"{"name":"root","catalog":{"react":"18.3.1"}}"#,
            &[
                (APP, r#"{"name":"mobile","dependencies":{"expo-image":"~2.0.0"}}"#),
                ("packages/a/package.json", r#"{"name":"a","dependencies":{"expo-image":"~2.0.0","react":"18.3.1"}}"#),
                ("packages/b/package.json", r#"{"name":"b","devDependencies":{"expo-image":"~2.0.0","zod":"3.23.8"}}"#),
            ],
        );
        let managed = ManagedSet::from_names(["expo-image", "react"]);
        let missing = find_missing(&ws, Some(APP), &managed);
        assert_eq!(
            missing,
            vec![MissingEntry {
                package: "expo-image".to_owned(),
                manifests: vec![
                    "packages/a/package.json".to_owned(),
                    "packages/b/package.json".to_owned()
                ],
            }]
        );
    }
}
