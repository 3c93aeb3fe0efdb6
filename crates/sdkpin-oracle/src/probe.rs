use crate::oracle::Basis;
use crate::OracleError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Placeholder in a probe command template replaced by the package name.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Phrases in the SDK tool's output meaning it holds an expected version for the package.
pub const MANAGED_MARKERS: &[&str] = &[
    "should be updated",
    "expected version",
    "using the correct version",
];

/// Phrases meaning the SDK tool has no opinion about the package.
pub const UNMANAGED_MARKERS: &[&str] = &[
    "not found in the",
    "not managed by the",
    "not supported",
    "not included",
];

/// Captured result of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProbeOutput {
    pub fn text(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Something that can ask the SDK tool about one package.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Run the probe for `package` with `app_dir` as working directory.
    async fn probe(&self, package: &str, app_dir: &Path) -> Result<ProbeOutput, OracleError>;
}

/// Classify probe output as managed or not.
///
/// A clean exit means the tool raised nothing, so the package is not managed.
/// On a failing exit the combined text is matched case-insensitively: managed
/// markers win over unmanaged ones, and text matching neither is treated as
/// not managed.
pub fn classify_probe_output(output: &ProbeOutput) -> (bool, Basis) {
    if output.success {
        return (false, Basis::ProbeClean);
    }
    let text = output.text().to_lowercase();
    if MANAGED_MARKERS.iter().any(|m| text.contains(m)) {
        (true, Basis::ProbeMismatch)
    } else if UNMANAGED_MARKERS.iter().any(|m| text.contains(m)) {
        (false, Basis::ProbeExplicitUnmanaged)
    } else {
        (false, Basis::ProbeUnrecognized)
    }
}

/// Probe that runs an external command such as `bunx expo install <pkg> --check`.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, OracleError> {
        match argv.first() {
            Some(program) if !program.trim().is_empty() => Ok(Self { argv, timeout }),
            _ => Err(OracleError::EmptyCommand),
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The command line for `package`. Without a placeholder the package is appended.
    pub fn argv_for(&self, package: &str) -> Vec<String> {
        let mut argv: Vec<String> = self
            .argv
            .iter()
            .map(|a| a.replace(PACKAGE_PLACEHOLDER, package))
            .collect();
        if !self.argv.iter().any(|a| a.contains(PACKAGE_PLACEHOLDER)) {
            argv.push(package.to_owned());
        }
        argv
    }
}

#[async_trait]
impl ProbeRunner for CommandProbe {
    fn name(&self) -> &str {
        self.program()
    }

    async fn probe(&self, package: &str, app_dir: &Path) -> Result<ProbeOutput, OracleError> {
        let argv = self.argv_for(package);
        debug!("probe in {}: {}", app_dir.display(), argv.join(" "));

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(app_dir)
            .env("CI", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OracleError::Timeout {
                package: package.to_owned(),
                secs: self.timeout.as_secs(),
            })??;

        Ok(ProbeOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
