use jiff::Timestamp;

use crate::error::{Result, TixError};
use crate::parser::{Document, is_storable};
use crate::types::{
    FIELD_ASSIGNEE, FIELD_BLOCKED_BY, FIELD_CREATED, FIELD_ID, FIELD_PARENT, FIELD_PRIORITY,
    FIELD_SCHEMA_VERSION, FIELD_STATUS, FIELD_TYPE, SCHEMA_VERSION, TicketPriority, TicketStatus,
    TicketType,
};
use crate::utils::validate_id;

/// Everything needed to create a ticket except its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    title: String,
    description: Option<String>,
    ticket_type: TicketType,
    priority: TicketPriority,
    parent: Option<String>,
    assignee: Option<String>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>) -> Self {
        NewTicket {
            title: title.into(),
            description: None,
            ticket_type: TicketType::default(),
            priority: TicketPriority::default(),
            parent: None,
            assignee: None,
        }
    }

    pub fn description(mut self, desc: Option<impl Into<String>>) -> Self {
        self.description = desc.map(|d| d.into());
        self
    }

    pub fn ticket_type(mut self, ticket_type: TicketType) -> Self {
        self.ticket_type = ticket_type;
        self
    }

    pub fn priority(mut self, priority: TicketPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn parent(mut self, parent: Option<impl Into<String>>) -> Self {
        self.parent = parent.map(|p| p.into());
        self
    }

    pub fn assignee(mut self, assignee: Option<impl Into<String>>) -> Self {
        self.assignee = assignee.map(|a| a.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Reject input that cannot be written as a single frontmatter or
    /// heading line.
    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TixError::MissingArgument("title".to_string()));
        }
        if title.contains(['\n', '\r']) {
            return Err(TixError::InvalidField {
                field: "title".to_string(),
                value: self.title.clone(),
                reason: "must be a single line".to_string(),
            });
        }
        if let Some(parent) = &self.parent {
            validate_id(parent)?;
        }
        if let Some(assignee) = &self.assignee {
            if assignee.trim().is_empty() || assignee.contains(['\n', '\r']) {
                return Err(TixError::InvalidField {
                    field: FIELD_ASSIGNEE.to_string(),
                    value: assignee.clone(),
                    reason: "must be a non-empty single line".to_string(),
                });
            }
            if !is_storable(FIELD_ASSIGNEE, assignee.trim()) {
                return Err(TixError::InvalidField {
                    field: FIELD_ASSIGNEE.to_string(),
                    value: assignee.clone(),
                    reason: "must not contain ': '".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render the ticket file for `id`, created at `created`.
    ///
    /// Fields are written in the order `id, schema_version, blocked-by,
    /// created, priority, status, type`, followed by the optional fields.
    pub fn render(&self, id: &str, created: Timestamp) -> Result<String> {
        self.validate()?;

        let created = super::whole_seconds(created);

        let mut fields = vec![
            (FIELD_ID, id.to_string()),
            (FIELD_SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
            (FIELD_BLOCKED_BY, "[]".to_string()),
            (FIELD_CREATED, created.to_string()),
            (FIELD_PRIORITY, self.priority.to_string()),
            (FIELD_STATUS, TicketStatus::Open.to_string()),
            (FIELD_TYPE, self.ticket_type.to_string()),
        ];
        if let Some(parent) = &self.parent {
            fields.push((FIELD_PARENT, parent.clone()));
        }
        if let Some(assignee) = &self.assignee {
            fields.push((FIELD_ASSIGNEE, assignee.trim().to_string()));
        }

        let mut body = format!("# {}\n", self.title.trim());
        if let Some(desc) = &self.description {
            body.push('\n');
            body.push_str(desc.trim_end());
            body.push('\n');
        }

        Ok(Document::from_fields(fields, &body).emit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::parse_summary;

    fn at() -> Timestamp {
        "2026-01-04T10:00:00.750Z".parse().unwrap()
    }

    #[test]
    fn test_render_field_order() {
        let content = NewTicket::new("Fix login")
            .ticket_type(TicketType::Bug)
            .priority(TicketPriority::P1)
            .parent(Some("0t8k2m1abc"))
            .assignee(Some("sam"))
            .render("0t8k2m2xyz", at())
            .unwrap();

        assert_eq!(
            content,
            "---\nid: 0t8k2m2xyz\nschema_version: 1\nblocked-by: []\ncreated: 2026-01-04T10:00:00Z\npriority: 1\nstatus: open\ntype: bug\nparent: 0t8k2m1abc\nassignee: sam\n---\n# Fix login\n"
        );
    }

    #[test]
    fn test_render_parses_back() {
        let content = NewTicket::new("With description")
            .description(Some("Some details.\n\n"))
            .render("abc", at())
            .unwrap();
        assert!(content.ends_with("# With description\n\nSome details.\n"));

        let summary = parse_summary("abc.md", &content).unwrap();
        assert_eq!(summary.status, TicketStatus::Open);
        assert_eq!(summary.ticket_type, TicketType::Task);
        assert_eq!(summary.priority, TicketPriority::P2);
        assert_eq!(summary.title.as_deref(), Some("With description"));
        assert!(summary.blocked_by.is_empty());
    }

    #[test]
    fn test_rejects_bad_titles() {
        assert!(matches!(
            NewTicket::new("  ").render("abc", at()),
            Err(TixError::MissingArgument(_))
        ));
        assert!(matches!(
            NewTicket::new("two\nlines").render("abc", at()),
            Err(TixError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_rejects_assignee_that_would_not_read_back() {
        for assignee in ["Bob: Smith", "team: a: b", " ", "a\nb"] {
            let result = NewTicket::new("T").assignee(Some(assignee)).render("abc", at());
            assert!(
                matches!(&result, Err(TixError::InvalidField { field, .. }) if field == "assignee"),
                "{assignee:?} gave {result:?}"
            );
        }

        let content = NewTicket::new("T")
            .assignee(Some("ops:oncall"))
            .render("abc", at())
            .unwrap();
        let summary = parse_summary("abc.md", &content).unwrap();
        assert_eq!(summary.assignee.as_deref(), Some("ops:oncall"));
    }

    #[test]
    fn test_created_at_extremes_renders() {
        let content = NewTicket::new("T").render("abc", Timestamp::MAX).unwrap();
        assert!(parse_summary("abc.md", &content).is_ok());
    }

    #[test]
    fn test_rejects_bad_parent() {
        let result = NewTicket::new("T").parent(Some("../x")).render("abc", at());
        assert!(matches!(result, Err(TixError::InvalidId(_))));
    }
}
