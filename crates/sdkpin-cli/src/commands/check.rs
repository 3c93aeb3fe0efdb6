use super::{dim, json_pretty, severity_icon, with_spinner, EXIT_FAILURE, EXIT_SUCCESS};
use sdkpin_core::{CheckOutcome, Engine, Severity};

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let outcome = with_spinner(json, "checking manifests...", "checked manifests", || {
        engine.check().map_err(|e| e.to_string())
    })?;

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        print_report(&outcome);
    }
    Ok(if outcome.report.has_errors() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

fn print_report(outcome: &CheckOutcome) {
    let source = outcome
        .authority
        .as_ref()
        .map_or_else(|| "SDK probe".to_owned(), |p| p.display().to_string());
    println!("app: {}", outcome.app.manifest_rel_path);
    println!("{}", dim(&format!("managed packages from {source}")));

    for (manifest, diagnostics) in outcome.report.grouped() {
        println!("\n{manifest}");
        for d in diagnostics {
            let subject = d.package.as_deref().unwrap_or("-");
            let code = if d.severity == Severity::Ok {
                String::new()
            } else {
                format!(" [{} {}]", d.rule.code(), d.rule.name())
            };
            println!("  {} {subject}: {}{}", severity_icon(d.severity), d.message, dim(&code));
        }
    }

    let s = &outcome.report.summary;
    println!(
        "\n{} error(s), {} warning(s), {} ok; {} file(s) with errors, {} with warnings only",
        s.errors, s.warnings, s.ok, s.files_with_errors, s.files_with_warnings
    );
    if s.errors > 0 {
        println!("{}", dim("run `sdkpin fix` to repair must-use-catalog and unused-catalog-entry"));
    }
}
