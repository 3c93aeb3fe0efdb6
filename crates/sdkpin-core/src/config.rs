//! `sdkpin.toml` configuration.

use crate::CoreError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "sdkpin.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdkpinConfig {
    /// Dependency whose presence marks the mobile app manifest.
    pub sdk_package: String,
    /// File name of the bundled-module list inside `node_modules/<sdk_package>/`.
    pub authority_file: String,
    pub typings_prefixes: Vec<String>,
    pub probe: ProbeConfig,
    pub restore: RestoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Probe argv; `{package}` is replaced by the package under test.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestoreConfig {
    /// Manifests scanned when git cannot report changes. Empty means every member.
    pub fallback_manifests: Vec<String>,
}

impl Default for SdkpinConfig {
    fn default() -> Self {
        Self {
            sdk_package: "expo".to_owned(),
            authority_file: "bundledNativeModules.json".to_owned(),
            typings_prefixes: vec!["@types/".to_owned()],
            probe: ProbeConfig::default(),
            restore: RestoreConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: ["bunx", "expo", "install", "{package}", "--check"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            timeout_secs: 60,
            concurrency: 4,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Install command suggested for `packages`: the probe argv up to the
    /// package placeholder, followed by the package names.
    pub fn install_command(&self, packages: &[String]) -> String {
        let prefix: Vec<&str> = self
            .command
            .iter()
            .take_while(|a| !a.contains("{package}"))
            .map(String::as_str)
            .collect();
        let mut parts = prefix;
        parts.extend(packages.iter().map(String::as_str));
        parts.join(" ")
    }
}

impl SdkpinConfig {
    pub fn from_toml_str(input: &str, origin: &Path) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(input).map_err(|e| CoreError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), else `<root>/sdkpin.toml` if
    /// present, else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, CoreError> {
        let path: PathBuf = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("no {CONFIG_FILE}; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|e| CoreError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!("loaded config from {}", path.display());
        Self::from_toml_str(&content, &path)
    }

    fn validate(&self, origin: &Path) -> Result<(), CoreError> {
        let invalid = |reason: &str| CoreError::Config {
            path: origin.to_path_buf(),
            reason: reason.to_owned(),
        };
        if self.sdk_package.trim().is_empty() {
            return Err(invalid("sdk_package must not be empty"));
        }
        if !self.probe.program().is_some_and(|p| !p.trim().is_empty()) {
            return Err(invalid("probe.command must name a program"));
        }
        if self.probe.concurrency == 0 {
            return Err(invalid("probe.concurrency must be at least 1"));
        }
        if self.probe.timeout_secs == 0 {
            return Err(invalid("probe.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
