//! Version reference grammar.
//!
//! A declared version is either a pointer into the root catalog, a pointer to
//! another workspace member, or an opaque concrete version that is only ever
//! compared for equality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel prefix for a shared-catalog reference.
pub const CATALOG_PROTOCOL: &str = "catalog:";
/// Sentinel prefix for an intra-workspace reference.
pub const WORKSPACE_PROTOCOL: &str = "workspace:";

/// Classification of a declared version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRef<'a> {
    Catalog,
    Workspace,
    Concrete(&'a str),
}

impl VersionRef<'_> {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            VersionRef::Catalog => ReferenceKind::Catalog,
            VersionRef::Workspace => ReferenceKind::Workspace,
            VersionRef::Concrete(_) => ReferenceKind::Concrete,
        }
    }
}

/// Payload-free form of [`VersionRef`], used in derived records and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Catalog,
    Workspace,
    Concrete,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Catalog => write!(f, "catalog"),
            ReferenceKind::Workspace => write!(f, "workspace"),
            ReferenceKind::Concrete => write!(f, "concrete"),
        }
    }
}

/// Classify a version string. Total and pure.
///
/// Named catalogs (`catalog:<name>`) are treated as catalog references; the
/// root manifest only carries the default catalog, so such references resolve
/// against it like the bare sentinel.
pub fn classify_version(version: &str) -> VersionRef<'_> {
    if version.starts_with(CATALOG_PROTOCOL) {
        VersionRef::Catalog
    } else if version.starts_with(WORKSPACE_PROTOCOL) {
        VersionRef::Workspace
    } else {
        VersionRef::Concrete(version)
    }
}
