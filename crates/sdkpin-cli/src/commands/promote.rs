use super::{json_pretty, print_promote, print_write, with_spinner, write_status};
use sdkpin_core::Engine;

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let outcome = with_spinner(json, "promoting to catalog...", "promote done", || {
        engine.promote(dry_run).map_err(|e| e.to_string())
    })?;
    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        if outcome.changes.is_empty() {
            println!("nothing to promote");
        }
        print_promote(&outcome.changes);
        print_write(&outcome.write);
    }
    Ok(write_status(&outcome.write))
}
