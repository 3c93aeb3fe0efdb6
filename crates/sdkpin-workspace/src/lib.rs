//! Workspace discovery and manifest persistence for sdkpin.
//!
//! This crate owns every `package.json` document: `WorkspaceLayout` expands the
//! root manifest's workspace globs into member manifest paths,
//! `ManifestRepository` loads them (skipping malformed members) and writes them
//! back atomically, `WorkspaceLock` serializes write-back across processes, and
//! `detect_changed_manifests` reads the git change signal used by restore.

pub mod changes;
pub mod layout;
pub mod lock;
pub mod repository;

pub use changes::{detect_changed_manifests, ChangeSignal};
pub use layout::WorkspaceLayout;
pub use lock::WorkspaceLock;
pub use repository::{LoadedWorkspace, ManifestEntry, ManifestRepository, SkippedManifest};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot load root manifest {}: {source}", path.display())]
    RootManifest {
        path: PathBuf,
        source: sdkpin_schema::ManifestError,
    },
    #[error("invalid workspace pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("manifest error: {0}")]
    Manifest(#[from] sdkpin_schema::ManifestError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
}
