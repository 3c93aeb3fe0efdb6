//! Catalog conformance engine for sdkpin.
//!
//! Builds the dependency usage index from a loaded workspace, evaluates the
//! catalog rule table against managed-package verdicts from the oracle, and
//! applies the repairs (promote, prune, sync, restore) that bring manifests
//! back to a conforming state. `Engine` is the entry point the CLI drives.

pub mod concurrency;
pub mod config;
pub mod engine;
pub mod managed;
pub mod repair;
pub mod report;
pub mod rules;
pub mod usage;
pub mod validate;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use config::{ProbeConfig, RestoreConfig, SdkpinConfig, CONFIG_FILE};
pub use engine::{
    CheckOutcome, Engine, FixChanges, RepairOutcome, RestoreOutcome, RestoreScope, WriteSummary,
};
pub use managed::ManagedSet;
pub use repair::{
    find_missing, promote, prune, sync_from_app, CatalogConflict, CatalogEdit, MissingEntry,
    PromoteOutcome, Rewrite, SyncAction, SyncChange, SyncOutcome,
};
pub use report::{Report, Summary};
pub use rules::{evaluate_usage, Diagnostic, RuleId, Severity};
pub use usage::{classification_targets, collect_usages, DependencyUsage, ManifestRole};
pub use validate::{validate, ValidationContext};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] sdkpin_schema::ManifestError),
    #[error("workspace error: {0}")]
    Workspace(#[from] sdkpin_workspace::WorkspaceError),
    #[error("oracle error: {0}")]
    Oracle(#[from] sdkpin_oracle::OracleError),
    #[error("invalid config {}: {reason}", path.display())]
    Config {
        path: std::path::PathBuf,
        reason: String,
    },
    #[error("no workspace member declares '{0}'; cannot locate the mobile app")]
    NoSdkApp(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_app_error_names_sdk_package() {
        let e = CoreError::NoSdkApp("expo".to_owned());
        assert!(e.to_string().contains("'expo'"));
    }

    #[test]
    fn workspace_errors_convert() {
        let inner = sdkpin_workspace::WorkspaceError::LockFailed("busy".to_owned());
        let e: CoreError = inner.into();
        assert!(matches!(e, CoreError::Workspace(_)));
    }
}
