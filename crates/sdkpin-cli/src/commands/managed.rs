use super::{json_pretty, severity_icon, with_spinner, EXIT_SUCCESS};
use sdkpin_core::{Engine, Severity};

pub fn run(engine: &Engine, packages: &[String], json: bool) -> Result<u8, String> {
    let verdicts = with_spinner(json, "classifying packages...", "classified", || {
        engine.managed(packages).map_err(|e| e.to_string())
    })?;
    if json {
        println!("{}", json_pretty(&verdicts)?);
        return Ok(EXIT_SUCCESS);
    }

    let width = verdicts.keys().map(String::len).max().unwrap_or(0);
    for (package, verdict) in &verdicts {
        let (icon, label) = if verdict.managed {
            (severity_icon(Severity::Ok), "managed")
        } else {
            ("·".to_owned(), "independent")
        };
        let detail = verdict
            .detail
            .as_deref()
            .map(|d| format!(": {d}"))
            .unwrap_or_default();
        println!("  {icon} {package:<width$}  {label:<11}  ({}{detail})", verdict.basis);
    }
    let managed = verdicts.values().filter(|v| v.managed).count();
    println!("\n{managed} of {} package(s) SDK-managed", verdicts.len());
    Ok(EXIT_SUCCESS)
}
