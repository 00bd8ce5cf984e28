use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TixError;

/// Directory name of the tix root, relative to the working directory.
pub const TIX_DIR: &str = ".tix";

/// Subdirectory of the root holding the ticket files.
pub const TICKETS_ITEMS_DIR: &str = "items";

/// The only frontmatter schema version this build understands.
pub const SCHEMA_VERSION: u32 = 1;

pub const FIELD_ID: &str = "id";
pub const FIELD_SCHEMA_VERSION: &str = "schema_version";
pub const FIELD_BLOCKED_BY: &str = "blocked-by";
pub const FIELD_CREATED: &str = "created";
pub const FIELD_PRIORITY: &str = "priority";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_PARENT: &str = "parent";
pub const FIELD_ASSIGNEE: &str = "assignee";
pub const FIELD_CLOSED: &str = "closed";

/// Fields a projection may name. `title` and `filename` are derived rather
/// than stored in the frontmatter.
pub const PROJECTABLE_FIELDS: &[&str] = &[
    FIELD_ID,
    FIELD_SCHEMA_VERSION,
    FIELD_BLOCKED_BY,
    FIELD_CREATED,
    FIELD_PRIORITY,
    FIELD_STATUS,
    FIELD_TYPE,
    FIELD_PARENT,
    FIELD_ASSIGNEE,
    FIELD_CLOSED,
    "title",
    "filename",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(TixError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Bug,
    Feature,
    #[default]
    Task,
    Epic,
    Chore,
}

impl TicketType {
    pub const ALL: [TicketType; 5] = [
        TicketType::Bug,
        TicketType::Feature,
        TicketType::Task,
        TicketType::Epic,
        TicketType::Chore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Bug => "bug",
            TicketType::Feature => "feature",
            TicketType::Task => "task",
            TicketType::Epic => "epic",
            TicketType::Chore => "chore",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = TixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bug" => Ok(TicketType::Bug),
            "feature" => Ok(TicketType::Feature),
            "task" => Ok(TicketType::Task),
            "epic" => Ok(TicketType::Epic),
            "chore" => Ok(TicketType::Chore),
            _ => Err(TixError::InvalidType(s.to_string())),
        }
    }
}

/// Ticket priority, 1 (most urgent) through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TicketPriority {
    P1,
    #[default]
    P2,
    P3,
    P4,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::P1,
        TicketPriority::P2,
        TicketPriority::P3,
        TicketPriority::P4,
    ];

    pub fn as_num(&self) -> u8 {
        match self {
            TicketPriority::P1 => 1,
            TicketPriority::P2 => 2,
            TicketPriority::P3 => 3,
            TicketPriority::P4 => 4,
        }
    }
}

impl TryFrom<u8> for TicketPriority {
    type Error = TixError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(TicketPriority::P1),
            2 => Ok(TicketPriority::P2),
            3 => Ok(TicketPriority::P3),
            4 => Ok(TicketPriority::P4),
            _ => Err(TixError::InvalidPriority(n.to_string())),
        }
    }
}

impl From<TicketPriority> for u8 {
    fn from(p: TicketPriority) -> u8 {
        p.as_num()
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_num())
    }
}

impl FromStr for TicketPriority {
    type Err = TixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .map_err(|_| TixError::InvalidPriority(s.to_string()))
            .and_then(TicketPriority::try_from)
    }
}

/// Typed view of one ticket's frontmatter, plus its filename and title.
///
/// This is the only representation the cache and the query engine work with;
/// ticket bodies are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub filename: String,
    pub id: String,
    pub schema_version: u32,
    pub status: TicketStatus,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    pub created: String,
    #[serde(rename = "blocked-by", default)]
    pub blocked_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Summary {
    /// Render a single field for projections. Absent optional fields yield
    /// `None`; unknown names are rejected by the caller beforehand.
    pub fn field_value(&self, name: &str) -> Option<String> {
        match name {
            FIELD_ID => Some(self.id.clone()),
            FIELD_SCHEMA_VERSION => Some(self.schema_version.to_string()),
            FIELD_BLOCKED_BY => Some(format_id_list(&self.blocked_by)),
            FIELD_CREATED => Some(self.created.clone()),
            FIELD_PRIORITY => Some(self.priority.to_string()),
            FIELD_STATUS => Some(self.status.to_string()),
            FIELD_TYPE => Some(self.ticket_type.to_string()),
            FIELD_PARENT => self.parent.clone(),
            FIELD_ASSIGNEE => self.assignee.clone(),
            FIELD_CLOSED => self.closed.clone(),
            "title" => self.title.clone(),
            "filename" => Some(self.filename.clone()),
            _ => None,
        }
    }
}

/// Render a list of ids the way `blocked-by` is written: `[a, b]`, or `[]`.
pub fn format_id_list(ids: &[String]) -> String {
    format!("[{}]", ids.join(", "))
}

/// Filename of the ticket with the given id.
pub fn ticket_filename(id: &str) -> String {
    format!("{id}.md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert!(matches!(
            "complete".parse::<TicketStatus>(),
            Err(TixError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_priority_bounds() {
        assert_eq!("1".parse::<TicketPriority>().unwrap(), TicketPriority::P1);
        assert_eq!("4".parse::<TicketPriority>().unwrap(), TicketPriority::P4);
        assert!("0".parse::<TicketPriority>().is_err());
        assert!("5".parse::<TicketPriority>().is_err());
        assert!("high".parse::<TicketPriority>().is_err());
    }

    #[test]
    fn test_type_rejects_unknown() {
        assert_eq!("epic".parse::<TicketType>().unwrap(), TicketType::Epic);
        assert!(matches!(
            "story".parse::<TicketType>(),
            Err(TixError::InvalidType(_))
        ));
    }

    #[test]
    fn test_summary_json_uses_frontmatter_names() {
        let summary = Summary {
            filename: "abc.md".to_string(),
            id: "abc".to_string(),
            schema_version: 1,
            status: TicketStatus::InProgress,
            ticket_type: TicketType::Bug,
            priority: TicketPriority::P3,
            created: "2026-01-04T00:00:00Z".to_string(),
            blocked_by: vec!["x".to_string()],
            parent: None,
            assignee: None,
            closed: None,
            title: Some("Fix it".to_string()),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["type"], "bug");
        assert_eq!(json["priority"], 3);
        assert_eq!(json["blocked-by"][0], "x");
        assert!(json.get("parent").is_none());

        let back: Summary = serde_json::from_value(json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_field_value_projection() {
        let summary = Summary {
            filename: "abc.md".to_string(),
            id: "abc".to_string(),
            schema_version: 1,
            status: TicketStatus::Open,
            ticket_type: TicketType::Task,
            priority: TicketPriority::P2,
            created: "2026-01-04T00:00:00Z".to_string(),
            blocked_by: vec![],
            parent: Some("p".to_string()),
            assignee: None,
            closed: None,
            title: None,
        };
        assert_eq!(summary.field_value("blocked-by").as_deref(), Some("[]"));
        assert_eq!(summary.field_value("parent").as_deref(), Some("p"));
        assert_eq!(summary.field_value("assignee"), None);
    }
}
