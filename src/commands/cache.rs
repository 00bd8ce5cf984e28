use serde_json::json;

use super::{CommandOutput, Outcome, print_json};
use crate::error::Result;
use crate::store::TicketStore;

pub fn cmd_cache_status(store: &TicketStore, output_json: bool) -> Result<Outcome> {
    let status = store.cache_status()?;

    if output_json {
        print_json(&status)?;
        return Ok(Outcome::Success);
    }

    println!("Cache status:");
    println!("  Path: {}", status.path.display());
    if !status.exists {
        println!("  Not built yet; it is created on the next listing.");
        return Ok(Outcome::Success);
    }
    let state = match (status.valid, status.fresh) {
        (false, _) => "corrupt (will be rebuilt)",
        (true, false) => "stale (will be refreshed)",
        (true, true) => "fresh",
    };
    println!("  State: {state}");
    println!("  Cached tickets: {}", status.entries);
    println!("  Unparseable files: {}", status.invalid);
    println!("  Size: {} bytes", status.size_bytes);
    Ok(Outcome::Success)
}

pub fn cmd_cache_rebuild(store: &TicketStore, output_json: bool) -> Result<Outcome> {
    let cache = store.rebuild_cache()?;
    CommandOutput::new(json!({
        "action": "cache_rebuilt",
        "ticket_count": cache.len(),
        "invalid_count": cache.invalid().len(),
    }))
    .with_text(format!("Cache rebuilt: {} tickets", cache.len()))
    .print(output_json)
}

pub fn cmd_cache_clear(store: &TicketStore, output_json: bool) -> Result<Outcome> {
    let removed = store.clear_cache()?;
    let text = if removed {
        "Cache cleared"
    } else {
        "No cache to clear"
    };
    CommandOutput::new(json!({
        "action": "cache_cleared",
        "removed": removed,
    }))
    .with_text(text)
    .print(output_json)
}

pub fn cmd_cache_path(store: &TicketStore, output_json: bool) -> Result<Outcome> {
    let path = store.cache_path();
    CommandOutput::new(json!({ "path": path.to_string_lossy() }))
        .with_text(path.display().to_string())
        .print(output_json)
}
