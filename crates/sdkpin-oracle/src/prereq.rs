use std::fmt;
use std::process::Command;

/// A missing external tool with an actionable install hint.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the tools the oracle and restore flows shell out to.
///
/// `probe_program` is only required when no authority list is available.
pub fn check_prereqs(probe_program: Option<&str>) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if let Some(program) = probe_program {
        if !command_exists(program) {
            missing.push(MissingPrereq {
                name: program.to_owned(),
                purpose: "probing the SDK for managed packages",
                install_hint: "install the JavaScript runtime that provides it, or set probe.command",
            });
        }
    }

    if !command_exists("git") {
        missing.push(MissingPrereq {
            name: "git".to_owned(),
            purpose: "detecting changed manifests for restore",
            install_hint: "apt install git | dnf install git | brew install git",
        });
    }

    missing
}

pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "bunx".to_owned(),
            purpose: "probing",
            install_hint: "curl -fsSL https://bun.sh/install | bash",
        };
        let s = m.to_string();
        assert!(s.contains("bunx"));
        assert!(s.contains("probing"));
    }

    #[test]
    fn absent_probe_program_is_reported() {
        let missing = check_prereqs(Some("sdkpin-no-such-program-xyz"));
        assert!(missing
            .iter()
            .any(|m| m.name == "sdkpin-no-such-program-xyz"));
        let text = format_missing(&missing);
        assert!(text.starts_with("missing prerequisites:"));
    }

    #[test]
    fn no_probe_program_skips_that_check() {
        let missing = check_prereqs(None);
        assert!(missing.iter().all(|m| m.name == "git"));
    }
}
