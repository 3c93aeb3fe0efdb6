//! The catalog rule table.
//!
//! Usage rules (`R1` to `R6`) are evaluated independently per declaration by
//! [`evaluate_usage`]; catalog-integrity rules (`R7`, `R8`) are evaluated per
//! catalog entry by the validator.

use crate::usage::DependencyUsage;
use sdkpin_schema::{is_typings_package, DependencySlot, ReferenceKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "ok"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    ConcreteInApp,
    CatalogMissingInApp,
    MustUseCatalog,
    UndefinedCatalogRef,
    VersionMismatch,
    WrongSlot,
    UnusedCatalogEntry,
    ForeignCatalogEntry,
    Ok,
    ProbeFailed,
    SkippedManifest,
}

impl RuleId {
    /// Short code shown next to diagnostics.
    pub fn code(self) -> &'static str {
        match self {
            Self::ConcreteInApp => "R1",
            Self::CatalogMissingInApp => "R2",
            Self::MustUseCatalog => "R3",
            Self::UndefinedCatalogRef => "R4",
            Self::VersionMismatch => "R5",
            Self::WrongSlot => "R6",
            Self::UnusedCatalogEntry => "R7",
            Self::ForeignCatalogEntry => "R8",
            Self::Ok => "ok",
            Self::ProbeFailed => "probe",
            Self::SkippedManifest => "skip",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ConcreteInApp => "concrete-in-app",
            Self::CatalogMissingInApp => "catalog-missing-in-app",
            Self::MustUseCatalog => "must-use-catalog",
            Self::UndefinedCatalogRef => "undefined-catalog-ref",
            Self::VersionMismatch => "version-mismatch",
            Self::WrongSlot => "wrong-slot",
            Self::UnusedCatalogEntry => "unused-catalog-entry",
            Self::ForeignCatalogEntry => "foreign-catalog-entry",
            Self::Ok => "ok",
            Self::ProbeFailed => "probe-failed",
            Self::SkippedManifest => "skipped-manifest",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::ConcreteInApp
            | Self::CatalogMissingInApp
            | Self::MustUseCatalog
            | Self::UndefinedCatalogRef
            | Self::ForeignCatalogEntry => Severity::Error,
            Self::VersionMismatch
            | Self::WrongSlot
            | Self::UnusedCatalogEntry
            | Self::ProbeFailed
            | Self::SkippedManifest => Severity::Warning,
            Self::Ok => Severity::Ok,
        }
    }

    /// Whether `sdkpin fix` repairs this rule mechanically.
    pub fn auto_fixable(self) -> bool {
        matches!(self, Self::MustUseCatalog | Self::UnusedCatalogEntry)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<DependencySlot>,
    pub severity: Severity,
    pub rule: RuleId,
    pub message: String,
}

impl Diagnostic {
    pub fn for_usage(usage: &DependencyUsage, rule: RuleId, message: String) -> Self {
        Self {
            manifest: usage.manifest.clone(),
            package: Some(usage.package.clone()),
            slot: Some(usage.slot),
            severity: rule.severity(),
            rule,
            message,
        }
    }

    pub fn for_package(manifest: &str, package: &str, rule: RuleId, message: String) -> Self {
        Self {
            manifest: manifest.to_owned(),
            package: Some(package.to_owned()),
            slot: None,
            severity: rule.severity(),
            rule,
            message,
        }
    }

    pub fn for_manifest(manifest: &str, rule: RuleId, message: String) -> Self {
        Self {
            manifest: manifest.to_owned(),
            package: None,
            slot: None,
            severity: rule.severity(),
            rule,
            message,
        }
    }
}

/// Apply the usage rules to one declaration.
///
/// Workspace references are exempt. Root-manifest declarations are only
/// checked for undefined catalog references. A managed usage that breaks no
/// rule yields a single `ok` diagnostic; an unmanaged usage that breaks no
/// rule yields nothing.
pub fn evaluate_usage<S: AsRef<str>>(
    usage: &DependencyUsage,
    catalog: Option<&BTreeMap<String, String>>,
    managed: bool,
    typings_prefixes: &[S],
) -> Vec<Diagnostic> {
    if usage.kind == ReferenceKind::Workspace {
        return Vec::new();
    }

    let pkg = usage.package.as_str();
    let catalog_version = catalog.and_then(|c| c.get(pkg)).map(String::as_str);
    let is_catalog_ref = usage.kind == ReferenceKind::Catalog;
    if usage.is_root() {
        return if is_catalog_ref && catalog_version.is_none() {
            vec![undefined_catalog_ref(usage)]
        } else {
            Vec::new()
        };
    }

    let in_deps = usage.slot == DependencySlot::Dependencies;
    let is_concrete = usage.kind == ReferenceKind::Concrete;
    let mut out = Vec::new();

    if usage.is_app() && managed {
        if in_deps && is_catalog_ref {
            out.push(Diagnostic::for_usage(
                usage,
                RuleId::ConcreteInApp,
                format!("{pkg} is SDK-managed; the app must pin a concrete version, not \"catalog:\""),
            ));
        }
        if is_catalog_ref && catalog_version.is_none() {
            out.push(Diagnostic::for_usage(
                usage,
                RuleId::CatalogMissingInApp,
                format!("{pkg} references the catalog but the catalog has no entry for it"),
            ));
        }
    }

    if !usage.is_app() && managed && in_deps && is_concrete {
        out.push(Diagnostic::for_usage(
            usage,
            RuleId::MustUseCatalog,
            format!(
                "{pkg}@{} is SDK-managed; declare it as \"catalog:\"",
                usage.version
            ),
        ));
        if let Some(expected) = catalog_version {
            if expected != usage.version {
                out.push(Diagnostic::for_usage(
                    usage,
                    RuleId::VersionMismatch,
                    format!(
                        "{pkg}@{} differs from catalog version {expected}",
                        usage.version
                    ),
                ));
            }
        }
    }

    let r2_fired = out.iter().any(|d| d.rule == RuleId::CatalogMissingInApp);
    if is_catalog_ref && catalog_version.is_none() && !r2_fired {
        out.push(undefined_catalog_ref(usage));
    }

    if managed
        && usage.slot == DependencySlot::DevDependencies
        && !is_typings_package(pkg, typings_prefixes)
    {
        out.push(Diagnostic::for_usage(
            usage,
            RuleId::WrongSlot,
            format!("{pkg} is SDK-managed; move it from devDependencies to dependencies"),
        ));
    }

    if out.is_empty() && managed {
        let message = match (usage.kind, catalog_version) {
            (ReferenceKind::Catalog, Some(v)) => format!("{pkg} uses catalog version {v}"),
            _ => format!("{pkg}@{} pinned", usage.version),
        };
        out.push(Diagnostic::for_usage(usage, RuleId::Ok, message));
    }
    out
}

fn undefined_catalog_ref(usage: &DependencyUsage) -> Diagnostic {
    Diagnostic::for_usage(
        usage,
        RuleId::UndefinedCatalogRef,
        format!(
            "{} references the catalog but the catalog has no entry for it",
            usage.package
        ),
    )
}
