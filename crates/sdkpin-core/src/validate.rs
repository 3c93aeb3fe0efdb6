use crate::managed::ManagedSet;
use crate::rules::{evaluate_usage, Diagnostic, RuleId};
use crate::usage::collect_usages;
use sdkpin_schema::ReferenceKind;
use sdkpin_workspace::LoadedWorkspace;
use std::collections::BTreeSet;

/// Inputs to a validation pass besides the manifests themselves.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub app_manifest: Option<&'a str>,
    pub managed: &'a ManagedSet,
    pub typings_prefixes: &'a [String],
}

/// Evaluate the full rule table over a loaded workspace.
///
/// Produces, in order: skipped-manifest warnings, per-usage diagnostics for
/// every member manifest, catalog-integrity diagnostics (one per offending
/// catalog entry), and probe-failure warnings (one per package).
pub fn validate(ws: &LoadedWorkspace, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = ws
        .skipped
        .iter()
        .map(|s| Diagnostic::for_manifest(&s.rel_path, RuleId::SkippedManifest, s.reason.clone()))
        .collect();

    let usages = collect_usages(ws, ctx.app_manifest);
    let catalog = ws.root.manifest.catalog();

    for usage in &usages {
        out.extend(evaluate_usage(
            usage,
            catalog,
            ctx.managed.is_managed(&usage.package),
            ctx.typings_prefixes,
        ));
    }

    if let Some(catalog) = catalog {
        let referenced: BTreeSet<&str> = usages
            .iter()
            .filter(|u| u.kind == ReferenceKind::Catalog)
            .map(|u| u.package.as_str())
            .collect();
        let root = ws.root.rel_path.as_str();

        for (package, version) in catalog {
            if !referenced.contains(package.as_str()) {
                out.push(Diagnostic::for_package(
                    root,
                    package,
                    RuleId::UnusedCatalogEntry,
                    format!("catalog entry {package}@{version} is not referenced by any manifest"),
                ));
            }
            if !ctx.managed.is_managed(package) {
                out.push(Diagnostic::for_package(
                    root,
                    package,
                    RuleId::ForeignCatalogEntry,
                    format!(
                        "catalog entry {package}@{version} is not SDK-managed; remove it from the catalog"
                    ),
                ));
            }
        }
    }

    let probe_context = ctx.app_manifest.unwrap_or(ws.root.rel_path.as_str());
    for (package, verdict) in ctx.managed.failed() {
        let detail = verdict.detail.as_deref().unwrap_or("probe failed");
        out.push(Diagnostic::for_package(
            probe_context,
            package,
            RuleId::ProbeFailed,
            format!("could not classify {package} ({detail}); treated as not managed"),
        ));
    }

    out
}
