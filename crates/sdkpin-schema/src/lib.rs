//! Package manifest model and version reference grammar for sdkpin.
//!
//! This crate defines the schema layer: `package.json` parsing into a typed
//! view that still remembers the original document (`PackageManifest`),
//! deterministic re-serialization, the three dependency declaration slots
//! (`DependencySlot`), and the pure version reference classifier
//! (`classify_version`).

pub mod manifest;
pub mod reference;
pub mod types;

pub use manifest::{parse_manifest_file, parse_manifest_str, ManifestError, PackageManifest};
pub use reference::{classify_version, ReferenceKind, VersionRef, CATALOG_PROTOCOL, WORKSPACE_PROTOCOL};
pub use types::{is_typings_package, DependencySlot, DEFAULT_TYPINGS_PREFIXES, MANIFEST_FILE};
