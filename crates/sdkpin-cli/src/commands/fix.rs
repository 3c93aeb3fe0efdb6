use super::{json_pretty, print_promote, print_write, with_spinner, write_status};
use sdkpin_core::Engine;

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let outcome = with_spinner(json, "repairing catalog...", "repair done", || {
        engine.fix(dry_run).map_err(|e| e.to_string())
    })?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(write_status(&outcome.write));
    }

    let changes = &outcome.changes;
    if changes.promote.is_empty() && changes.pruned.is_empty() {
        println!("nothing to fix");
    }
    print_promote(&changes.promote);
    for removed in &changes.pruned {
        println!("  - catalog {}@{}", removed.package, removed.version);
    }
    print_write(&outcome.write);
    Ok(write_status(&outcome.write))
}
