//! Managed-package oracle for sdkpin.
//!
//! Answers "does the SDK pin this package's version?" for the detected mobile
//! app. Two strategies are tried in order: the SDK's bundled-module list
//! (`AuthorityList`), read once per app, and otherwise a heuristic probe of the
//! SDK's command-line tool (`CommandProbe`) whose free-text output is
//! classified by `classify_probe_output`. Results are memoized in a
//! `ManagedCache`; probes run concurrently under a bounded limit and a timeout.

pub mod app;
pub mod authority;
pub mod cache;
pub mod mock;
pub mod oracle;
pub mod prereq;
pub mod probe;

pub use app::{find_sdk_app, SdkApp};
pub use authority::{authority_candidates, load_authority_list, AuthorityList};
pub use cache::ManagedCache;
pub use mock::ScriptedProbe;
pub use oracle::{Basis, Classification, ManagedOracle, OracleOptions};
pub use prereq::{check_prereqs, command_exists, format_missing, MissingPrereq};
pub use probe::{classify_probe_output, CommandProbe, ProbeOutput, ProbeRunner};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("probe command must name a program")]
    EmptyCommand,
    #[error("cannot run probe '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("probe for '{package}' timed out after {secs}s")]
    Timeout { package: String, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_names_package() {
        let e = OracleError::Timeout {
            package: "expo-image".to_owned(),
            secs: 30,
        };
        let msg = e.to_string();
        assert!(msg.contains("expo-image"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn spawn_display_names_program() {
        let e = OracleError::Spawn {
            program: "bunx".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.to_string().contains("bunx"));
    }
}
