use super::{dim, json_pretty, print_write, with_spinner, write_status};
use sdkpin_core::{Engine, SyncAction};

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let outcome = with_spinner(json, "syncing catalog from app...", "sync done", || {
        engine.sync(dry_run).map_err(|e| e.to_string())
    })?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(write_status(&outcome.write));
    }

    let changes = &outcome.changes;
    for c in &changes.changes {
        match (c.action, &c.from) {
            (SyncAction::Added, _) => println!("  + {}@{}", c.package, c.to),
            (SyncAction::Updated, Some(from)) => println!("  ~ {} {from} -> {}", c.package, c.to),
            (SyncAction::Updated, None) => println!("  ~ {} -> {}", c.package, c.to),
            (SyncAction::Unchanged, _) => println!("{}", dim(&format!("  = {}@{}", c.package, c.to))),
        }
    }
    println!(
        "{} added, {} updated, {} unchanged",
        changes.count(SyncAction::Added),
        changes.count(SyncAction::Updated),
        changes.count(SyncAction::Unchanged)
    );
    if !changes.not_in_app.is_empty() {
        println!("catalog entries the app does not declare (kept):");
        for package in &changes.not_in_app {
            println!("  {package}");
        }
    }
    print_write(&outcome.write);
    Ok(write_status(&outcome.write))
}
