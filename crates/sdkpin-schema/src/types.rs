use serde::{Deserialize, Serialize};
use std::fmt;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// Name prefixes of typings-only packages.
pub const DEFAULT_TYPINGS_PREFIXES: &[&str] = &["@types/"];

/// The dependency map a package is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencySlot {
    #[serde(rename = "dependencies")]
    Dependencies,
    #[serde(rename = "devDependencies")]
    DevDependencies,
    #[serde(rename = "peerDependencies")]
    PeerDependencies,
}

impl DependencySlot {
    pub const ALL: [DependencySlot; 3] = [
        DependencySlot::Dependencies,
        DependencySlot::DevDependencies,
        DependencySlot::PeerDependencies,
    ];

    /// The JSON field holding this slot's map.
    pub fn field_name(self) -> &'static str {
        match self {
            DependencySlot::Dependencies => "dependencies",
            DependencySlot::DevDependencies => "devDependencies",
            DependencySlot::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

pub fn is_typings_package<S: AsRef<str>>(name: &str, prefixes: &[S]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p.as_ref()))
}
