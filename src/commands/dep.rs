use serde_json::json;

use super::{CommandOutput, Outcome};
use crate::error::Result;
use crate::store::TicketStore;

/// Record that `id` is blocked by `blocker`
pub fn cmd_block(store: &TicketStore, id: &str, blocker: &str, output_json: bool) -> Result<Outcome> {
    let summary = store.block(id, blocker)?;
    CommandOutput::new(json!({
        "id": summary.id,
        "action": "blocker_added",
        "blocker": blocker,
        "blocked_by": summary.blocked_by,
    }))
    .with_text(format!("Added blocker: {} <- {}", summary.id, blocker))
    .print(output_json)
}

/// Remove `blocker` from the blockers of `id`
pub fn cmd_unblock(store: &TicketStore, id: &str, blocker: &str, output_json: bool) -> Result<Outcome> {
    let summary = store.unblock(id, blocker)?;
    CommandOutput::new(json!({
        "id": summary.id,
        "action": "blocker_removed",
        "blocker": blocker,
        "blocked_by": summary.blocked_by,
    }))
    .with_text(format!("Removed blocker: {} <-/- {}", summary.id, blocker))
    .print(output_json)
}
