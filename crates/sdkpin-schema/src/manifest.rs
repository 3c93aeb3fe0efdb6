use crate::types::DependencySlot;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("manifest must be a JSON object")]
    NotAnObject,
    #[error("manifest is missing a non-empty 'name' field")]
    MissingName,
    #[error("'{field}' must be an object mapping package names to version strings")]
    InvalidMap { field: String },
    #[error("'{field}.{package}' must be a version string")]
    InvalidVersion { field: String, package: String },
    #[error("'workspaces' must be a list of glob patterns or an object with a 'packages' list")]
    InvalidWorkspaces,
}

/// A parsed `package.json`.
///
/// The typed fields are the only parts sdkpin reads or rewrites. The original
/// document is retained so that serialization keeps every other field, and the
/// position of every top-level key, exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
    dependencies: BTreeMap<String, String>,
    dev_dependencies: BTreeMap<String, String>,
    peer_dependencies: BTreeMap<String, String>,
    catalog: Option<BTreeMap<String, String>>,
    workspaces: Vec<String>,
    document: Map<String, Value>,
    modified: bool,
}

impl PackageManifest {
    pub fn dependencies(&self, slot: DependencySlot) -> &BTreeMap<String, String> {
        match slot {
            DependencySlot::Dependencies => &self.dependencies,
            DependencySlot::DevDependencies => &self.dev_dependencies,
            DependencySlot::PeerDependencies => &self.peer_dependencies,
        }
    }

    fn dependencies_mut(&mut self, slot: DependencySlot) -> &mut BTreeMap<String, String> {
        match slot {
            DependencySlot::Dependencies => &mut self.dependencies,
            DependencySlot::DevDependencies => &mut self.dev_dependencies,
            DependencySlot::PeerDependencies => &mut self.peer_dependencies,
        }
    }

    /// Iterate `(slot, package, version)` over all three slots.
    pub fn declarations(&self) -> impl Iterator<Item = (DependencySlot, &str, &str)> + '_ {
        DependencySlot::ALL.into_iter().flat_map(move |slot| {
            self.dependencies(slot)
                .iter()
                .map(move |(name, version)| (slot, name.as_str(), version.as_str()))
        })
    }

    /// Whether `package` appears in `dependencies` or `devDependencies`.
    pub fn declares_runtime_or_dev(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }

    /// Replace the version of an existing declaration. Returns `false` if the
    /// package is not declared in `slot` or already has that version.
    pub fn set_version(&mut self, slot: DependencySlot, package: &str, version: &str) -> bool {
        let Some(current) = self.dependencies_mut(slot).get_mut(package) else {
            return false;
        };
        if *current == version {
            return false;
        }
        version.clone_into(current);
        self.modified = true;
        true
    }

    /// The root catalog, if the manifest carries one.
    pub fn catalog(&self) -> Option<&BTreeMap<String, String>> {
        self.catalog.as_ref()
    }

    pub fn catalog_entry(&self, package: &str) -> Option<&str> {
        self.catalog
            .as_ref()
            .and_then(|c| c.get(package))
            .map(String::as_str)
    }

    /// Insert or replace a catalog entry. Returns the previous version.
    pub fn set_catalog_entry(&mut self, package: &str, version: &str) -> Option<String> {
        let catalog = self.catalog.get_or_insert_with(BTreeMap::new);
        if catalog.get(package).map(String::as_str) == Some(version) {
            return Some(version.to_owned());
        }
        self.modified = true;
        catalog.insert(package.to_owned(), version.to_owned())
    }

    pub fn remove_catalog_entry(&mut self, package: &str) -> Option<String> {
        let removed = self.catalog.as_mut().and_then(|c| c.remove(package));
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Workspace member glob patterns, in declaration order.
    pub fn workspaces(&self) -> &[String] {
        &self.workspaces
    }

    /// Whether any mutation changed the typed view since parsing.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reset the modification flag after the document has been persisted.
    pub fn mark_clean(&mut self) {
        self.modified = false;
    }

    /// Serialize the manifest as a whole document.
    ///
    /// Dependency maps and the catalog are emitted in sorted key order. A map
    /// that was absent from the original document and is still empty is not
    /// added.
    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        let mut document = self.document.clone();
        for slot in DependencySlot::ALL {
            write_map(&mut document, slot.field_name(), self.dependencies(slot));
        }
        if let Some(catalog) = &self.catalog {
            write_map(&mut document, "catalog", catalog);
        }
        let mut out = serde_json::to_string_pretty(&Value::Object(document))?;
        out.push('\n');
        Ok(out)
    }
}

fn write_map(document: &mut Map<String, Value>, field: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() && !document.contains_key(field) {
        return;
    }
    let value: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    // Existing keys are replaced in place, which keeps their position.
    document.insert(field.to_owned(), Value::Object(value));
}

fn read_map(
    document: &Map<String, Value>,
    field: &str,
) -> Result<BTreeMap<String, String>, ManifestError> {
    let Some(value) = document.get(field) else {
        return Ok(BTreeMap::new());
    };
    let Some(object) = value.as_object() else {
        return Err(ManifestError::InvalidMap {
            field: field.to_owned(),
        });
    };
    object
        .iter()
        .map(|(name, version)| match version.as_str() {
            Some(v) => Ok((name.clone(), v.to_owned())),
            None => Err(ManifestError::InvalidVersion {
                field: field.to_owned(),
                package: name.clone(),
            }),
        })
        .collect()
}

fn read_workspaces(document: &Map<String, Value>) -> Result<Vec<String>, ManifestError> {
    let list = match document.get("workspaces") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(Value::Object(obj)) => match obj.get("packages") {
            Some(Value::Array(items)) => items,
            None => return Ok(Vec::new()),
            Some(_) => return Err(ManifestError::InvalidWorkspaces),
        },
        Some(_) => return Err(ManifestError::InvalidWorkspaces),
    };
    list.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or(ManifestError::InvalidWorkspaces)
        })
        .collect()
}

pub fn parse_manifest_str(input: &str) -> Result<PackageManifest, ManifestError> {
    let Value::Object(document) = serde_json::from_str::<Value>(input)? else {
        return Err(ManifestError::NotAnObject);
    };

    let name = match document.get("name").and_then(Value::as_str) {
        Some(n) if !n.trim().is_empty() => n.to_owned(),
        _ => return Err(ManifestError::MissingName),
    };
    let version = document
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let catalog = if document.contains_key("catalog") {
        Some(read_map(&document, "catalog")?)
    } else {
        None
    };

    Ok(PackageManifest {
        name,
        version,
        dependencies: read_map(&document, "dependencies")?,
        dev_dependencies: read_map(&document, "devDependencies")?,
        peer_dependencies: read_map(&document, "peerDependencies")?,
        catalog,
        workspaces: read_workspaces(&document)?,
        document,
        modified: false,
    })
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<PackageManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = r#"{
  "name": "monorepo",
  "private": true,
  "workspaces": ["apps/*", "packages/*"],
  "scripts": {
    "check": "sdkpin check"
  },
  "catalog": {
    "react": "18.3.1",
    "date-fns": "3.0.0"
  },
  "devDependencies": {
    "typescript": "5.6.3"
  }
}
"#;

    #[test]
    fn parses_root_manifest() {
        let m = parse_manifest_str(ROOT).expect("should parse");
        assert_eq!(m.name, "monorepo");
        assert_eq!(m.workspaces(), ["apps/*", "packages/*"]);
        assert_eq!(m.catalog_entry("react"), Some("18.3.1"));
        assert_eq!(
            m.dependencies(DependencySlot::DevDependencies)
                .get("typescript")
                .map(String::as_str),
            Some("5.6.3")
        );
        assert!(m.dependencies(DependencySlot::Dependencies).is_empty());
        assert!(!m.is_modified());
    }

    #[test]
    fn parses_object_form_workspaces() {
        let m = parse_manifest_str(r#"{"name":"r","workspaces":{"packages":["libs/*"]}}"#)
            .unwrap();
        assert_eq!(m.workspaces(), ["libs/*"]);
    }

    #[test]
    fn rejects_missing_name() {
        let err = parse_manifest_str(r#"{"version":"1.0.0"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::MissingName));
        let err = parse_manifest_str(r#"{"name":"  "}"#).unwrap_err();
        assert!(matches!(err, ManifestError::MissingName));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_manifest_str("{\"name\": ").unwrap_err(),
            ManifestError::ParseJson(_)
        ));
        assert!(matches!(
            parse_manifest_str("[]").unwrap_err(),
            ManifestError::NotAnObject
        ));
    }

    #[test]
    fn rejects_non_string_versions() {
        let err = parse_manifest_str(r#"{"name":"a","dependencies":{"x":1}}"#).unwrap_err();
        assert!(
            matches!(err, ManifestError::InvalidVersion { ref field, ref package } if field == "dependencies" && package == "x")
        );
    }

    #[test]
    fn unmodified_roundtrip_keeps_key_order_and_unknown_fields() {
        let m = parse_manifest_str(ROOT).unwrap();
        let out = m.to_json_string().unwrap();
        let private = out.find("\"private\"").unwrap();
        let scripts = out.find("\"scripts\"").unwrap();
        let catalog = out.find("\"catalog\"").unwrap();
        assert!(private < scripts && scripts < catalog);
        assert!(out.contains("\"check\": \"sdkpin check\""));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn catalog_is_written_sorted() {
        let mut m = parse_manifest_str(ROOT).unwrap();
        m.set_catalog_entry("expo-image", "~2.0.0");
        let out = m.to_json_string().unwrap();
        let date = out.find("\"date-fns\"").unwrap();
        let image = out.find("\"expo-image\"").unwrap();
        let react = out.find("\"react\"").unwrap();
        assert!(date < image && image < react);
    }

    #[test]
    fn set_version_marks_modified_only_on_change() {
        let mut m = parse_manifest_str(ROOT).unwrap();
        assert!(!m.set_version(DependencySlot::DevDependencies, "typescript", "5.6.3"));
        assert!(!m.is_modified());
        assert!(!m.set_version(DependencySlot::Dependencies, "typescript", "catalog:"));
        assert!(m.set_version(DependencySlot::DevDependencies, "typescript", "catalog:"));
        assert!(m.is_modified());
    }

    #[test]
    fn catalog_mutation_tracks_previous_value() {
        let mut m = parse_manifest_str(ROOT).unwrap();
        assert_eq!(
            m.set_catalog_entry("react", "18.3.1").as_deref(),
            Some("18.3.1")
        );
        assert!(!m.is_modified());
        assert_eq!(m.remove_catalog_entry("date-fns").as_deref(), Some("3.0.0"));
        assert!(m.is_modified());
        assert_eq!(m.remove_catalog_entry("date-fns"), None);
    }

    #[test]
    fn absent_empty_maps_are_not_added() {
        let m = parse_manifest_str(r#"{"name":"leaf"}"#).unwrap();
        let out = m.to_json_string().unwrap();
        assert!(!out.contains("dependencies"));
        assert!(!out.contains("catalog"));
    }

    #[test]
    fn parse_manifest_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, ROOT).unwrap();
        let m = parse_manifest_file(&path).unwrap();
        assert_eq!(m.name, "monorepo");
    }
}
