use serde_json::json;

use super::{CommandOutput, Outcome};
use crate::error::Result;
use crate::store::TicketStore;
use crate::types::Summary;

fn status_changed(summary: &Summary, output_json: bool) -> Result<Outcome> {
    CommandOutput::new(json!({
        "id": summary.id,
        "action": "status_changed",
        "new_status": summary.status.to_string(),
        "closed": summary.closed,
    }))
    .with_text(format!("Updated {} -> {}", summary.id, summary.status))
    .print(output_json)
}

/// Move a ticket from open to in_progress
pub fn cmd_start(store: &TicketStore, id: &str, output_json: bool) -> Result<Outcome> {
    status_changed(&store.start(id)?, output_json)
}

/// Close an in-progress ticket
pub fn cmd_close(store: &TicketStore, id: &str, output_json: bool) -> Result<Outcome> {
    status_changed(&store.close(id)?, output_json)
}

/// Reopen a closed ticket
pub fn cmd_reopen(store: &TicketStore, id: &str, output_json: bool) -> Result<Outcome> {
    status_changed(&store.reopen(id)?, output_json)
}
