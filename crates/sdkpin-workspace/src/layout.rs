use crate::WorkspaceError;
use sdkpin_schema::MANIFEST_FILE;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const NODE_MODULES: &str = "node_modules";

/// Directory layout of a JavaScript workspace.
///
/// Resolves the root manifest, member manifests declared by workspace globs,
/// and the per-workspace lock file used during write-back.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn root_manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Advisory lock file for this workspace.
    ///
    /// Lives in the system temp directory so that the workspace tree itself is
    /// never touched by locking; the name is derived from the workspace root.
    pub fn lock_file(&self) -> PathBuf {
        let canonical = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let digest = blake3::hash(canonical.to_string_lossy().as_bytes()).to_hex();
        std::env::temp_dir().join(format!("sdkpin-{}.lock", &digest[..16]))
    }

    /// Path of `path` relative to the workspace root, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Expand workspace glob patterns into member manifest paths.
    ///
    /// Each pattern names member directories; a pattern starting with `!`
    /// excludes matching directories. Directories without a manifest and
    /// anything under `node_modules` are ignored. The result is deduplicated
    /// and sorted lexically so diagnostics are reproducible.
    pub fn discover(&self, patterns: &[String]) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut excludes = Vec::new();
        for pattern in patterns {
            if let Some(negated) = pattern.strip_prefix('!') {
                let compiled = glob::Pattern::new(normalize_pattern(negated)).map_err(|e| {
                    WorkspaceError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    }
                })?;
                excludes.push(compiled);
            }
        }

        let root_manifest = self.root_manifest();
        let escaped_root = glob::Pattern::escape(&self.root.to_string_lossy());
        let mut found = BTreeSet::new();

        for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
            let full = format!("{escaped_root}/{}", normalize_pattern(pattern));
            let entries = glob::glob(&full).map_err(|e| WorkspaceError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;

            for dir in entries.flatten() {
                let within = dir.strip_prefix(&self.root).unwrap_or(&dir);
                if !dir.is_dir() || is_in_node_modules(within) {
                    continue;
                }
                let rel_dir = self.relative(&dir);
                if excludes.iter().any(|ex| ex.matches(&rel_dir)) {
                    debug!("excluded workspace member {rel_dir}");
                    continue;
                }
                let manifest = dir.join(MANIFEST_FILE);
                if manifest.is_file() && manifest != root_manifest {
                    found.insert(manifest);
                }
            }
        }

        Ok(found.into_iter().collect())
    }
}

fn normalize_pattern(pattern: &str) -> &str {
    let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
    trimmed.strip_suffix("/package.json").unwrap_or(trimmed)
}

fn is_in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == NODE_MODULES))
}
