use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{Result, TixError};
use crate::parser::{Document, parse_id_list};
use crate::types::{
    FIELD_ASSIGNEE, FIELD_BLOCKED_BY, FIELD_CLOSED, FIELD_CREATED, FIELD_ID, FIELD_PARENT,
    FIELD_PRIORITY, FIELD_SCHEMA_VERSION, FIELD_STATUS, FIELD_TYPE, SCHEMA_VERSION, Summary,
    TicketPriority, TicketStatus, TicketType,
};

/// Parse a ticket file's content into a validated [`Summary`].
///
/// `filename` is the file's name inside the ticket directory; the `id`
/// field must equal its stem.
pub fn parse_summary(filename: &str, content: &str) -> Result<Summary> {
    let doc = Document::parse(content)?;
    summary_from_document(filename, &doc)
}

/// Validate an already-parsed document and build its [`Summary`].
pub fn summary_from_document(filename: &str, doc: &Document) -> Result<Summary> {
    check_duplicates(doc)?;

    let schema_version = parse_schema_version(required(doc, FIELD_SCHEMA_VERSION)?)?;

    let id = required(doc, FIELD_ID)?.to_string();
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    if id != stem {
        return Err(TixError::IdMismatch {
            id,
            filename: filename.to_string(),
        });
    }

    let status = parse_enum::<TicketStatus>(doc, FIELD_STATUS)?;
    let ticket_type = parse_enum::<TicketType>(doc, FIELD_TYPE)?;
    let priority = parse_enum::<TicketPriority>(doc, FIELD_PRIORITY)?;
    let created = parse_timestamp(FIELD_CREATED, required(doc, FIELD_CREATED)?)?;

    let blocked_by_raw = required_allow_empty(doc, FIELD_BLOCKED_BY)?;
    let blocked_by = parse_id_list(blocked_by_raw).ok_or_else(|| {
        invalid(
            FIELD_BLOCKED_BY,
            blocked_by_raw,
            "expected a bracketed list such as [a, b] or []",
        )
    })?;

    let parent = optional(doc, FIELD_PARENT)?;
    let assignee = optional(doc, FIELD_ASSIGNEE)?;
    let closed = optional(doc, FIELD_CLOSED)?
        .map(|value| parse_timestamp(FIELD_CLOSED, &value))
        .transpose()?;

    match (status, &closed) {
        (TicketStatus::Closed, None) => {
            return Err(TixError::MissingField(FIELD_CLOSED.to_string()));
        }
        (TicketStatus::Open | TicketStatus::InProgress, Some(value)) => {
            return Err(invalid(
                FIELD_CLOSED,
                value,
                &format!("must be absent while status is {status}"),
            ));
        }
        _ => {}
    }

    Ok(Summary {
        filename: filename.to_string(),
        id,
        schema_version,
        status,
        ticket_type,
        priority,
        created,
        blocked_by,
        parent,
        assignee,
        closed,
        title: doc.title(),
    })
}

fn check_duplicates(doc: &Document) -> Result<()> {
    let mut seen = HashSet::new();
    for key in doc.keys() {
        if !seen.insert(key) {
            return Err(TixError::DuplicateField(key.to_string()));
        }
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> TixError {
    TixError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Required field whose value is checked by its own parser.
fn required_allow_empty<'a>(doc: &'a Document, field: &str) -> Result<&'a str> {
    doc.get(field)
        .ok_or_else(|| TixError::MissingField(field.to_string()))
}

fn required<'a>(doc: &'a Document, field: &str) -> Result<&'a str> {
    let value = required_allow_empty(doc, field)?;
    if value.trim().is_empty() {
        return Err(TixError::EmptyField(field.to_string()));
    }
    Ok(value)
}

fn optional(doc: &Document, field: &str) -> Result<Option<String>> {
    match doc.get(field) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(TixError::EmptyField(field.to_string())),
        Some(value) => Ok(Some(value.to_string())),
    }
}

fn parse_enum<T: FromStr>(doc: &Document, field: &str) -> Result<T> {
    let value = required(doc, field)?;
    value.parse::<T>().map_err(|_| {
        let reason = match field {
            FIELD_STATUS => "must be one of: open, in_progress, closed",
            FIELD_TYPE => "must be one of: bug, feature, task, epic, chore",
            FIELD_PRIORITY => "must be an integer from 1 to 4",
            _ => "unrecognized value",
        };
        invalid(field, value, reason)
    })
}

fn parse_schema_version(value: &str) -> Result<u32> {
    let version: u64 = value
        .parse()
        .map_err(|_| invalid(FIELD_SCHEMA_VERSION, value, "must be a positive integer"))?;

    if version == 0 {
        return Err(invalid(
            FIELD_SCHEMA_VERSION,
            value,
            "must be a positive integer",
        ));
    }
    if version != u64::from(SCHEMA_VERSION) {
        return Err(TixError::UnsupportedSchemaVersion(version));
    }
    Ok(SCHEMA_VERSION)
}

fn parse_timestamp(field: &str, value: &str) -> Result<String> {
    value
        .parse::<jiff::Timestamp>()
        .map(|_| value.to_string())
        .map_err(|e| invalid(field, value, &format!("not an RFC 3339 timestamp ({e})")))
}
