use sdkpin_schema::MANIFEST_FILE;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Outcome of asking version control which manifests changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSignal {
    /// Changed manifest paths, absolute, sorted. May be empty.
    Detected(Vec<PathBuf>),
    /// Version control could not be queried; callers fall back to a fixed list.
    Unavailable(String),
}

/// Manifests with uncommitted changes (staged or not) under `root`.
///
/// Runs `git diff --name-only --relative` with `root` as the working
/// directory; paths under `node_modules` are ignored.
pub fn detect_changed_manifests(root: &Path) -> ChangeSignal {
    let mut changed = BTreeSet::new();
    for extra in [None, Some("--cached")] {
        let mut cmd = Command::new("git");
        cmd.args(["diff", "--name-only", "--relative"]);
        if let Some(flag) = extra {
            cmd.arg(flag);
        }
        let output = match cmd.current_dir(root).output() {
            Ok(o) => o,
            Err(e) => return ChangeSignal::Unavailable(format!("cannot run git: {e}")),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ChangeSignal::Unavailable(format!("git diff failed: {}", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        changed.extend(
            manifest_paths(&stdout)
                .into_iter()
                .map(|rel| root.join(rel)),
        );
    }
    debug!("git reports {} changed manifest(s)", changed.len());
    ChangeSignal::Detected(changed.into_iter().collect())
}

fn manifest_paths(diff_output: &str) -> Vec<&str> {
    diff_output
        .lines()
        .map(str::trim)
        .filter(|line| {
            (*line == MANIFEST_FILE || line.ends_with(&format!("/{MANIFEST_FILE}")))
                && !line.split('/').any(|c| c == "node_modules")
        })
        .collect()
}
