use super::{json_pretty, with_spinner, EXIT_SUCCESS};
use sdkpin_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let missing = with_spinner(json, "looking for uncatalogued packages...", "scan done", || {
        engine.missing().map_err(|e| e.to_string())
    })?;
    let packages: Vec<String> = missing.iter().map(|m| m.package.clone()).collect();
    let install = (!packages.is_empty()).then(|| engine.config().probe.install_command(&packages));

    if json {
        let payload = serde_json::json!({
            "missing": missing,
            "install_command": install,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    if missing.is_empty() {
        println!("all SDK-managed packages are in the catalog");
        return Ok(EXIT_SUCCESS);
    }
    println!("{} package(s) missing from the catalog:", missing.len());
    for m in &missing {
        println!("  {} ({})", m.package, m.manifests.join(", "));
    }
    if let Some(cmd) = install {
        println!("\nInstall them in the app, then run `sdkpin sync`:\n  {cmd}");
    }
    Ok(EXIT_SUCCESS)
}
