//! Rendering summaries for the terminal.

use owo_colors::OwoColorize;
use serde_json::{Map, Value, json};

use crate::error::{Result, TixError};
use crate::query::Warning;
use crate::types::{PROJECTABLE_FIELDS, Summary, TicketPriority, TicketStatus};

/// Which part of each summary to print.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Field(String),
}

impl Projection {
    /// Projection onto `name`, rejecting fields a summary does not have.
    pub fn field(name: &str) -> Result<Self> {
        if PROJECTABLE_FIELDS.contains(&name) {
            Ok(Projection::Field(name.to_string()))
        } else {
            Err(TixError::UnknownField(name.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Render summaries, one line each for text or a single JSON array.
///
/// A field projection prints the bare value per ticket (empty for an absent
/// optional field); in JSON it yields `{"id": .., "<field>": ..}` objects.
pub fn render_summaries(
    tickets: &[Summary],
    projection: &Projection,
    format: Format,
) -> Result<String> {
    match (format, projection) {
        (Format::Json, Projection::All) => Ok(serde_json::to_string_pretty(tickets)?),
        (Format::Json, Projection::Field(name)) => {
            let rows: Vec<Value> = tickets
                .iter()
                .map(|t| {
                    let mut row = Map::new();
                    row.insert("id".to_string(), json!(t.id));
                    row.insert(name.clone(), json!(t.field_value(name)));
                    Value::Object(row)
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        (Format::Text, Projection::All) => Ok(tickets.iter().map(format_ticket_line).collect()),
        (Format::Text, Projection::Field(name)) => Ok(tickets
            .iter()
            .map(|t| format!("{}\n", t.field_value(name).unwrap_or_default()))
            .collect()),
    }
}

/// `<id> [P<n>][<status>] <type> - <title>` with a trailing newline.
pub fn format_ticket_line(ticket: &Summary) -> String {
    let priority = format!("[P{}]", ticket.priority);
    let priority = match ticket.priority {
        TicketPriority::P1 => priority.red().to_string(),
        TicketPriority::P2 => priority.yellow().to_string(),
        _ => priority,
    };

    format!(
        "{} {}{} {} - {}\n",
        format!("{:10}", ticket.id).cyan(),
        priority,
        format_status_colored(ticket.status),
        ticket.ticket_type,
        ticket.title.as_deref().unwrap_or("")
    )
}

pub fn format_status_colored(status: TicketStatus) -> String {
    let badge = format!("[{status}]");
    match status {
        TicketStatus::Open => badge.yellow().to_string(),
        TicketStatus::InProgress => badge.cyan().to_string(),
        TicketStatus::Closed => badge.dimmed().to_string(),
    }
}

pub fn format_warning(warning: &Warning) -> String {
    format!(
        "{} {}: {}",
        "Warning:".yellow(),
        warning.path.display(),
        warning.message
    )
}
