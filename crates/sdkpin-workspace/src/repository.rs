use crate::layout::WorkspaceLayout;
use crate::{fsync_dir, WorkspaceError};
use sdkpin_schema::{parse_manifest_str, ManifestError, PackageManifest};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// A loaded manifest together with where it lives.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub path: PathBuf,
    /// Path relative to the workspace root, `/`-separated; the manifest's identity in reports.
    pub rel_path: String,
    pub manifest: PackageManifest,
}

/// A member manifest that could not be loaded and was left out of the run.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedManifest {
    pub rel_path: String,
    pub reason: String,
}

/// The root manifest plus every member manifest that loaded.
#[derive(Debug, Clone)]
pub struct LoadedWorkspace {
    pub root: ManifestEntry,
    pub members: Vec<ManifestEntry>,
    pub skipped: Vec<SkippedManifest>,
}

impl LoadedWorkspace {
    pub fn member(&self, rel_path: &str) -> Option<&ManifestEntry> {
        self.members.iter().find(|m| m.rel_path == rel_path)
    }

    pub fn member_mut(&mut self, rel_path: &str) -> Option<&mut ManifestEntry> {
        self.members.iter_mut().find(|m| m.rel_path == rel_path)
    }
}

/// Sole owner of manifest documents on disk.
pub struct ManifestRepository {
    layout: WorkspaceLayout,
}

impl ManifestRepository {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn load(&self, path: &Path) -> Result<ManifestEntry, ManifestError> {
        let content = fs::read_to_string(path)?;
        let manifest = parse_manifest_str(&content)?;
        Ok(ManifestEntry {
            path: path.to_path_buf(),
            rel_path: self.layout.relative(path),
            manifest,
        })
    }

    /// Load the root manifest. Failure here aborts the run.
    pub fn load_root(&self) -> Result<ManifestEntry, WorkspaceError> {
        let path = self.layout.root_manifest();
        self.load(&path)
            .map_err(|source| WorkspaceError::RootManifest { path, source })
    }

    pub fn discover(&self, root: &PackageManifest) -> Result<Vec<PathBuf>, WorkspaceError> {
        self.layout.discover(root.workspaces())
    }

    /// Load the root manifest and every discovered member.
    ///
    /// Members that fail to load are recorded in `skipped` and the rest of the
    /// workspace is still returned.
    pub fn load_workspace(&self) -> Result<LoadedWorkspace, WorkspaceError> {
        let root = self.load_root()?;
        let paths = self.discover(&root.manifest)?;
        debug!("discovered {} member manifest(s)", paths.len());

        let mut members = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for path in paths {
            match self.load(&path) {
                Ok(entry) => members.push(entry),
                Err(e) => {
                    let rel_path = self.layout.relative(&path);
                    warn!("skipping manifest {rel_path}: {e}");
                    skipped.push(SkippedManifest {
                        rel_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(LoadedWorkspace {
            root,
            members,
            skipped,
        })
    }

    /// Persist `entry` if it was modified. Returns whether a write happened.
    ///
    /// The document is written to a temporary file in the destination
    /// directory, synced, and renamed over the original, so readers observe
    /// either the old or the new manifest and never a partial one.
    pub fn save(&self, entry: &mut ManifestEntry) -> Result<bool, WorkspaceError> {
        if !entry.manifest.is_modified() {
            return Ok(false);
        }
        let content = entry.manifest.to_json_string()?;
        if fs::read_to_string(&entry.path).is_ok_and(|current| current == content) {
            entry.manifest.mark_clean();
            return Ok(false);
        }

        write_atomic(&entry.path, &content).map_err(|source| WorkspaceError::Write {
            path: entry.path.clone(),
            source,
        })?;
        entry.manifest.mark_clean();
        info!("wrote {}", entry.rel_path);
        Ok(true)
    }
}

fn write_atomic(dest: &Path, content: &str) -> Result<(), std::io::Error> {
    let dir = dest
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    fsync_dir(&dir)?;
    Ok(())
}
