use crate::rules::{Diagnostic, RuleId, Severity};
use sdkpin_schema::DependencySlot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate counts for a validation pass.
///
/// Usage diagnostics are counted once per declaration at their highest
/// severity; catalog, probe and skipped-manifest diagnostics count individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub ok: usize,
    pub files_with_errors: usize,
    pub files_with_warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl Report {
    pub fn new(mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| a.manifest.cmp(&b.manifest));
        let summary = summarize(&diagnostics);
        Self {
            diagnostics,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Diagnostics keyed by manifest, manifests in lexical order.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&Diagnostic>> {
        let mut groups: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
        for d in &self.diagnostics {
            groups.entry(d.manifest.as_str()).or_default().push(d);
        }
        groups
    }

    pub fn count(&self, rule: RuleId) -> usize {
        self.diagnostics.iter().filter(|d| d.rule == rule).count()
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> Summary {
    let mut per_usage: BTreeMap<(&str, &str, DependencySlot), Severity> = BTreeMap::new();
    let mut summary = Summary::default();

    for d in diagnostics {
        match (&d.package, d.slot) {
            (Some(package), Some(slot)) => {
                let worst = per_usage
                    .entry((d.manifest.as_str(), package.as_str(), slot))
                    .or_insert(d.severity);
                *worst = (*worst).max(d.severity);
            }
            _ => bump(&mut summary, d.severity),
        }
    }
    for severity in per_usage.values() {
        bump(&mut summary, *severity);
    }

    let with_errors: BTreeSet<&str> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.manifest.as_str())
        .collect();
    let with_warnings: BTreeSet<&str> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning && !with_errors.contains(d.manifest.as_str()))
        .map(|d| d.manifest.as_str())
        .collect();
    summary.files_with_errors = with_errors.len();
    summary.files_with_warnings = with_warnings.len();
    summary
}

fn bump(summary: &mut Summary, severity: Severity) {
    match severity {
        Severity::Error => summary.errors += 1,
        Severity::Warning => summary.warnings += 1,
        Severity::Ok => summary.ok += 1,
    }
}
