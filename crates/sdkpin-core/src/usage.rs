use sdkpin_schema::{classify_version, DependencySlot, ReferenceKind};
use sdkpin_workspace::{LoadedWorkspace, ManifestEntry};
use serde::Serialize;
use std::collections::BTreeSet;

/// Which part a manifest plays in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestRole {
    Root,
    App,
    Member,
}

/// One dependency declaration in one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyUsage {
    pub package: String,
    pub version: String,
    pub manifest: String,
    pub slot: DependencySlot,
    pub kind: ReferenceKind,
    pub role: ManifestRole,
}

impl DependencyUsage {
    pub fn is_app(&self) -> bool {
        self.role == ManifestRole::App
    }

    pub fn is_root(&self) -> bool {
        self.role == ManifestRole::Root
    }
}

fn usages_of(
    entry: &ManifestEntry,
    role: ManifestRole,
) -> impl Iterator<Item = DependencyUsage> + '_ {
    entry
        .manifest
        .declarations()
        .map(move |(slot, package, version)| DependencyUsage {
            package: package.to_owned(),
            version: version.to_owned(),
            manifest: entry.rel_path.clone(),
            slot,
            kind: classify_version(version).kind(),
            role,
        })
}

/// Every declaration in the workspace: root manifest first, then members in
/// discovery order.
pub fn collect_usages(ws: &LoadedWorkspace, app_manifest: Option<&str>) -> Vec<DependencyUsage> {
    let mut out: Vec<DependencyUsage> = usages_of(&ws.root, ManifestRole::Root).collect();
    for member in &ws.members {
        let role = if Some(member.rel_path.as_str()) == app_manifest {
            ManifestRole::App
        } else {
            ManifestRole::Member
        };
        out.extend(usages_of(member, role));
    }
    out
}

/// Packages whose managed status a full check needs: everything members
/// declare by catalog or concrete version, plus every catalog entry.
pub fn classification_targets(ws: &LoadedWorkspace) -> BTreeSet<String> {
    let mut targets: BTreeSet<String> = ws
        .members
        .iter()
        .flat_map(|m| m.manifest.declarations())
        .filter(|(_, _, version)| classify_version(version).kind() != ReferenceKind::Workspace)
        .map(|(_, package, _)| package.to_owned())
        .collect();
    if let Some(catalog) = ws.root.manifest.catalog() {
        targets.extend(catalog.keys().cloned());
    }
    targets
}


#[cfg(test)]
mod tests {
    use super::fixtures::workspace;
    use super::*;

    const APP: &str = "apps/mobile/package.json";

    fn ws() -> LoadedWorkspace {
        workspace(
            r#"{"name":"root","catalog":{"react":"18.3.1","color":"4.2.3"},"devDependencies":{"typescript":"5.6.3"}}"#,
            &[
                (
                    APP,
                    r#"{"name":"mobile","dependencies":{"expo":"~52.0.0","react":"18.3.1"}}"#,
                ),
                (
                    "packages/ui/package.json",
                    r#"{"name":"ui","dependencies":{"react":"catalog:","@acme/core":"workspace:*"}}"#,
                ),
            ],
        )
    }

    #[test]
    fn roles_are_assigned() {
        let usages = collect_usages(&ws(), Some(APP));
        let root: Vec<_> = usages.iter().filter(|u| u.is_root()).collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].package, "typescript");
        assert!(usages
            .iter()
            .filter(|u| u.manifest == APP)
            .all(DependencyUsage::is_app));
    }

    #[test]
    fn kinds_are_classified() {
        let usages = collect_usages(&ws(), Some(APP));
        let ui: Vec<_> = usages
            .iter()
            .filter(|u| u.manifest == "packages/ui/package.json")
            .map(|u| (u.package.as_str(), u.kind))
            .collect();
        assert!(ui.contains(&("react", ReferenceKind::Catalog)));
        assert!(ui.contains(&("@acme/core", ReferenceKind::Workspace)));
    }

    #[test]
    fn targets_skip_workspace_refs_and_root_deps() {
        let targets = classification_targets(&ws());
        assert!(targets.contains("react"));
        assert!(targets.contains("color"));
        assert!(targets.contains("expo"));
        assert!(!targets.contains("@acme/core"));
        assert!(!targets.contains("typescript"));
    }
}
