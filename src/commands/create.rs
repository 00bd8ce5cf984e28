use serde_json::json;

use super::{CommandOutput, Outcome};
use crate::error::Result;
use crate::store::TicketStore;
use crate::ticket::NewTicket;
use crate::types::{TicketPriority, TicketType};

/// Options for creating a new ticket
pub struct CreateOptions {
    pub title: String,
    pub description: Option<String>,
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    pub assignee: Option<String>,
    pub parent: Option<String>,
}

/// Create a new ticket and print its id
pub fn cmd_create(store: &TicketStore, options: CreateOptions, output_json: bool) -> Result<Outcome> {
    let ticket = NewTicket::new(options.title)
        .description(options.description)
        .ticket_type(options.ticket_type)
        .priority(options.priority)
        .assignee(options.assignee)
        .parent(options.parent);

    let (id, path) = store.create(&ticket)?;

    CommandOutput::new(json!({
        "id": id,
        "title": ticket.title(),
        "status": "open",
        "type": options.ticket_type.to_string(),
        "priority": options.priority.as_num(),
        "file_path": path.to_string_lossy(),
    }))
    .with_text(id)
    .print(output_json)
}
