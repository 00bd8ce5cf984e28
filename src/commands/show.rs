use serde_json::json;

use super::{CommandOutput, Outcome};
use crate::error::Result;
use crate::store::TicketStore;

/// Print a ticket file as stored
pub fn cmd_show(store: &TicketStore, id: &str, output_json: bool) -> Result<Outcome> {
    let (summary, content) = store.show(id)?;
    CommandOutput::new(json!({
        "ticket": summary,
        "content": content,
    }))
    .with_text(content.trim_end())
    .print(output_json)
}
