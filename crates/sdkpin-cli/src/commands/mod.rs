pub mod check;
pub mod completions;
pub mod doctor;
pub mod fix;
pub mod managed;
pub mod missing;
pub mod promote;
pub mod prune;
pub mod restore;
pub mod sync;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use sdkpin_core::{PromoteOutcome, Severity, WriteSummary};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_WRITE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `f` under a spinner unless JSON output was requested.
pub fn with_spinner<T>(
    json: bool,
    msg: &str,
    done: &str,
    f: impl FnOnce() -> Result<T, String>,
) -> Result<T, String> {
    if json {
        return f();
    }
    let pb = spinner(msg);
    match f() {
        Ok(v) => {
            spin_ok(&pb, done);
            Ok(v)
        }
        Err(e) => {
            spin_fail(&pb, msg);
            Err(e)
        }
    }
}

pub fn severity_icon(severity: Severity) -> String {
    match severity {
        Severity::Error => Style::new().red().bold().apply_to("✗").to_string(),
        Severity::Warning => Style::new().yellow().apply_to("⚠").to_string(),
        Severity::Ok => Style::new().green().apply_to("✓").to_string(),
    }
}

pub fn dim(text: &str) -> String {
    Style::new().dim().apply_to(text).to_string()
}

pub fn print_promote(outcome: &PromoteOutcome) {
    for added in &outcome.added {
        println!("  + catalog {}@{}", added.package, added.version);
    }
    for r in &outcome.rewrites {
        println!("  ~ {}: {} {} -> {}", r.manifest, r.package, r.from, r.to);
    }
    for c in &outcome.conflicts {
        println!(
            "  ! {}: {}@{} differs from catalog {} (catalog kept)",
            c.manifest, c.package, c.version, c.catalog_version
        );
    }
}

pub fn print_write(write: &WriteSummary) {
    let verb = if write.dry_run { "would write" } else { "wrote" };
    if write.written.is_empty() {
        println!("{}", dim("no manifests changed"));
    } else {
        println!("{verb} {} manifest(s):", write.written.len());
        for path in &write.written {
            println!("  {path}");
        }
    }
    if write.interrupted {
        println!("interrupted: remaining manifests were not written");
    }
}

/// Exit status for a repair: failure if write-back was cut short.
pub fn write_status(write: &WriteSummary) -> u8 {
    if write.interrupted {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_MANIFEST_ERROR);
        assert_ne!(EXIT_MANIFEST_ERROR, EXIT_WRITE_ERROR);
    }

    #[test]
    fn severity_icons_differ() {
        assert!(severity_icon(Severity::Error).contains('✗'));
        assert!(severity_icon(Severity::Warning).contains('⚠'));
        assert!(severity_icon(Severity::Ok).contains('✓'));
    }

    #[test]
    fn interrupted_write_fails() {
        let write = WriteSummary {
            interrupted: true,
            ..WriteSummary::default()
        };
        assert_eq!(write_status(&write), EXIT_FAILURE);
        assert_eq!(write_status(&WriteSummary::default()), EXIT_SUCCESS);
    }

    #[test]
    fn with_spinner_passes_through_in_json_mode() {
        let v: Result<u8, String> = with_spinner(true, "x", "y", || Ok(7));
        assert_eq!(v.unwrap(), 7);
        let e: Result<u8, String> = with_spinner(true, "x", "y", || Err("boom".to_owned()));
        assert_eq!(e.unwrap_err(), "boom");
    }
}
