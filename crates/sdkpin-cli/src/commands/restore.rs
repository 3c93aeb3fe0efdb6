use super::{json_pretty, print_promote, print_write, with_spinner, write_status};
use sdkpin_core::{Engine, RestoreScope, SyncAction};

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let outcome = with_spinner(json, "restoring catalog references...", "restore done", || {
        engine.restore(dry_run).map_err(|e| e.to_string())
    })?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(write_status(&outcome.write));
    }

    let changes = &outcome.changes;
    match &changes.scope {
        RestoreScope::Changed if changes.scanned.is_empty() => {
            println!("no changed manifests");
            return Ok(write_status(&outcome.write));
        }
        RestoreScope::Changed => println!("changed manifests:"),
        RestoreScope::Fallback { reason } => {
            println!("change detection unavailable ({reason}); scanning:");
        }
    }
    for path in &changes.scanned {
        println!("  {path}");
    }
    if let Some(synced) = &changes.synced {
        println!(
            "catalog synced from app: {} added, {} updated",
            synced.count(SyncAction::Added),
            synced.count(SyncAction::Updated)
        );
    }
    print_promote(&changes.promote);
    print_write(&outcome.write);
    Ok(write_status(&outcome.write))
}
