use super::{json_pretty, print_write, write_status};
use sdkpin_core::Engine;

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let outcome = engine.prune(dry_run).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        if outcome.changes.is_empty() {
            println!("no unused catalog entries");
        }
        for removed in &outcome.changes {
            println!("  - catalog {}@{}", removed.package, removed.version);
        }
        print_write(&outcome.write);
    }
    Ok(write_status(&outcome.write))
}
