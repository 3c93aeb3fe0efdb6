use super::{EXIT_FAILURE, EXIT_SUCCESS};
use sdkpin_core::{Engine, SdkpinConfig};
use sdkpin_oracle::{authority_candidates, load_authority_list, SdkApp};
use sdkpin_workspace::LoadedWorkspace;
use std::path::Path;

pub fn run(root: &Path, config: Option<&Path>, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = match crate::load_config(root, config) {
        Ok(c) => {
            checks.push(Check::pass("config", "Configuration valid"));
            c
        }
        Err(e) => {
            checks.push(Check::fail("config", &e));
            return print_results(&checks, false, json_output);
        }
    };

    let engine = Engine::new(root, config);
    if let Some(ws) = check_workspace(&engine, &mut checks, &mut all_pass) {
        if let Some(app) = check_app(&engine, &ws, &mut checks, &mut all_pass) {
            let has_authority = check_authority(&engine, &app, &mut checks);
            check_prereqs(engine.config(), has_authority, &mut checks, &mut all_pass);
            return print_results(&checks, all_pass, json_output);
        }
    }
    check_prereqs(engine.config(), false, &mut checks, &mut all_pass);
    print_results(&checks, all_pass, json_output)
}

fn check_workspace(
    engine: &Engine,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<LoadedWorkspace> {
    match engine.load() {
        Ok(ws) => {
            checks.push(Check::pass(
                "root_manifest",
                &format!(
                    "Root manifest readable ({} catalog entries)",
                    ws.root.manifest.catalog().map_or(0, std::collections::BTreeMap::len)
                ),
            ));
            if ws.skipped.is_empty() {
                checks.push(Check::pass(
                    "members",
                    &format!("{} member manifest(s) parsed", ws.members.len()),
                ));
            } else {
                let names: Vec<&str> = ws.skipped.iter().map(|s| s.rel_path.as_str()).collect();
                checks.push(Check::warn(
                    "members",
                    &format!(
                        "{} member manifest(s) parsed, {} skipped: {}",
                        ws.members.len(),
                        ws.skipped.len(),
                        names.join(", ")
                    ),
                ));
            }
            Some(ws)
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("root_manifest", &e.to_string()));
            None
        }
    }
}

fn check_app(
    engine: &Engine,
    ws: &LoadedWorkspace,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<SdkApp> {
    match engine.locate_app(ws) {
        Ok(app) => {
            checks.push(Check::pass(
                "sdk_app",
                &format!("SDK app found at {}", app.manifest_rel_path),
            ));
            Some(app)
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("sdk_app", &e.to_string()));
            None
        }
    }
}

fn check_authority(engine: &Engine, app: &SdkApp, checks: &mut Vec<Check>) -> bool {
    let config = engine.config();
    let candidates = authority_candidates(
        app.dir(),
        engine.root(),
        &config.sdk_package,
        &config.authority_file,
    );
    if let Some(list) = load_authority_list(&candidates) {
        checks.push(Check::pass(
            "authority",
            &format!(
                "Authority list {} ({} packages)",
                list.path.display(),
                list.packages.len()
            ),
        ));
        true
    } else {
        checks.push(Check::info(
            "authority",
            "No authority list installed; packages will be classified by probing the SDK",
        ));
        false
    }
}

fn check_prereqs(
    config: &SdkpinConfig,
    has_authority: bool,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let program = config.probe.program();
    let missing = sdkpin_oracle::check_prereqs(program.filter(|_| !has_authority));
    if missing.is_empty() {
        checks.push(Check::pass("prereqs", "Required tools available"));
        return;
    }
    for m in &missing {
        if m.name == "git" {
            checks.push(Check::warn(
                "git",
                "git not found; restore will scan configured fallback manifests",
            ));
        } else {
            *all_pass = false;
            checks.push(Check::fail(
                "probe",
                &format!(
                    "Missing prerequisites: {}",
                    sdkpin_oracle::format_missing(std::slice::from_ref(m)).trim_end()
                ),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("sdkpin doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
