use crate::probe::{ProbeOutput, ProbeRunner};
use crate::OracleError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

enum Script {
    Output(ProbeOutput),
    Fail,
}

/// Probe with canned answers, for tests. Unscripted packages exit cleanly.
pub struct ScriptedProbe {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl Default for ScriptedProbe {
    fn default() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(mut self, package: &str, output: ProbeOutput) -> Self {
        self.scripts
            .insert(package.to_owned(), Script::Output(output));
        self
    }

    /// Answer as the SDK tool does for a package it pins.
    #[must_use]
    pub fn managed(self, package: &str) -> Self {
        let stderr = format!("{package}@0.0.0 - expected version: ~1.0.0");
        self.output(
            package,
            ProbeOutput {
                success: false,
                stdout: String::new(),
                stderr,
            },
        )
    }

    /// Answer as the SDK tool does for a package outside the SDK.
    #[must_use]
    pub fn unmanaged(self, package: &str) -> Self {
        let stderr = format!("{package} is not managed by the SDK");
        self.output(
            package,
            ProbeOutput {
                success: false,
                stdout: String::new(),
                stderr,
            },
        )
    }

    #[must_use]
    pub fn failing(mut self, package: &str) -> Self {
        self.scripts.insert(package.to_owned(), Script::Fail);
        self
    }

    pub fn calls(&self, package: &str) -> usize {
        self.recorded().iter().filter(|(p, _)| p == package).count()
    }

    pub fn total_calls(&self) -> usize {
        self.recorded().len()
    }

    /// Working directories of every recorded call, deduplicated.
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.recorded().into_iter().map(|(_, d)| d).collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }

    fn recorded(&self) -> Vec<(String, PathBuf)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProbeRunner for ScriptedProbe {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, package: &str, app_dir: &Path) -> Result<ProbeOutput, OracleError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((package.to_owned(), app_dir.to_path_buf()));
        match self.scripts.get(package) {
            Some(Script::Output(out)) => Ok(out.clone()),
            Some(Script::Fail) => Err(OracleError::Timeout {
                package: package.to_owned(),
                secs: 0,
            }),
            None => Ok(ProbeOutput {
                success: true,
                ..ProbeOutput::default()
            }),
        }
    }
}
