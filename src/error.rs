use std::path::PathBuf;

use thiserror::Error;

use crate::cache_error::CacheError;
use crate::types::TicketStatus;

/// Coarse classification of [`TixError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    NotFound,
    State,
    Relationship,
    Format,
    Io,
    Cache,
    Internal,
}

#[derive(Error, Debug)]
pub enum TixError {
    // Input errors
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid status '{0}'. Must be one of: open, in_progress, closed")]
    InvalidStatus(String),

    #[error("invalid ticket type '{0}'. Must be one of: bug, feature, task, epic, chore")]
    InvalidType(String),

    #[error("invalid priority '{0}'. Must be an integer from 1 to 4")]
    InvalidPriority(String),

    #[error("invalid ticket id '{0}': only letters, digits, '-' and '_' are allowed")]
    InvalidId(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("conflicting filters: {0}")]
    ConflictingFilters(String),

    #[error("offset {offset} is out of bounds ({total} matching tickets)")]
    OffsetOutOfBounds { offset: usize, total: usize },

    // Not-found errors
    #[error("ticket '{0}' not found")]
    TicketNotFound(String),

    #[error("blocker '{0}' not found")]
    BlockerNotFound(String),

    #[error("parent '{0}' not found")]
    ParentNotFound(String),

    // State errors
    #[error("ticket '{id}' is not open (status: {status})")]
    NotOpen { id: String, status: TicketStatus },

    #[error("ticket '{id}' is not in progress (status: {status})")]
    NotInProgress { id: String, status: TicketStatus },

    #[error("ticket '{id}' is not closed (status: {status})")]
    NotClosed { id: String, status: TicketStatus },

    #[error("ticket '{0}' is already in progress")]
    AlreadyInProgress(String),

    #[error("ticket '{0}' is already closed")]
    AlreadyClosed(String),

    #[error("ticket '{0}' is already open")]
    AlreadyOpen(String),

    #[error("parent '{parent}' of ticket '{id}' has not been started (status: {status})")]
    ParentNotStarted {
        id: String,
        parent: String,
        status: TicketStatus,
    },

    #[error("parent '{parent}' of ticket '{id}' is closed")]
    ParentClosed { id: String, parent: String },

    // Relationship errors
    #[error("ticket '{0}' cannot block itself")]
    CannotBlockSelf(String),

    #[error("ticket '{id}' is already blocked by '{blocker}'")]
    AlreadyBlockedBy { id: String, blocker: String },

    #[error("ticket '{id}' is not blocked by '{blocker}'")]
    NotBlockedBy { id: String, blocker: String },

    #[error("blocker cycle detected: {}", .0.join(" -> "))]
    BlockerCycle(Vec<String>),

    // Format errors
    #[error("no frontmatter: file must start with a '---' line")]
    NoFrontmatter,

    #[error("unclosed frontmatter: missing closing '---' line")]
    UnclosedFrontmatter,

    #[error("frontmatter overflow: more than {0} lines before the closing '---'")]
    FrontmatterOverflow(usize),

    #[error("invalid frontmatter line {line_no}: '{line}' (expected 'key: value')")]
    InvalidLine { line_no: usize, line: String },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{0}' must not be empty")]
    EmptyField(String),

    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    #[error("unsupported schema_version {0} (expected 1)")]
    UnsupportedSchemaVersion(u64),

    #[error("ticket id '{id}' does not match filename '{filename}'")]
    IdMismatch { id: String, filename: String },

    // I/O and infrastructure
    #[error("failed to {operation} {}: {source}", path.display())]
    Storage {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("failed to allocate a unique ticket id after {0} attempts")]
    IdAllocationExhausted(u32),
}

impl TixError {
    pub fn kind(&self) -> ErrorKind {
        use TixError::*;
        match self {
            MissingArgument(_)
            | InvalidStatus(_)
            | InvalidType(_)
            | InvalidPriority(_)
            | InvalidId(_)
            | UnknownField(_)
            | ConflictingFilters(_)
            | OffsetOutOfBounds { .. } => ErrorKind::Input,
            TicketNotFound(_) | BlockerNotFound(_) | ParentNotFound(_) => ErrorKind::NotFound,
            NotOpen { .. }
            | NotInProgress { .. }
            | NotClosed { .. }
            | AlreadyInProgress(_)
            | AlreadyClosed(_)
            | AlreadyOpen(_)
            | ParentNotStarted { .. }
            | ParentClosed { .. } => ErrorKind::State,
            CannotBlockSelf(_)
            | AlreadyBlockedBy { .. }
            | NotBlockedBy { .. }
            | BlockerCycle(_) => ErrorKind::Relationship,
            NoFrontmatter
            | UnclosedFrontmatter
            | FrontmatterOverflow(_)
            | InvalidLine { .. }
            | MissingField(_)
            | EmptyField(_)
            | DuplicateField(_)
            | InvalidField { .. }
            | UnsupportedSchemaVersion(_)
            | IdMismatch { .. } => ErrorKind::Format,
            Storage { .. } | Io(_) => ErrorKind::Io,
            Cache(_) => ErrorKind::Cache,
            Json(_) | YamlParse(_) | IdAllocationExhausted(_) => ErrorKind::Internal,
        }
    }

    /// True when a transition was refused because the ticket is already in
    /// the requested state.
    pub fn is_already_in_state(&self) -> bool {
        matches!(
            self,
            TixError::AlreadyInProgress(_) | TixError::AlreadyClosed(_) | TixError::AlreadyOpen(_)
        )
    }

    /// Adapter for `map_err` that attaches the failed operation and path.
    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> TixError {
        let path = path.into();
        move |source| TixError::Storage {
            operation,
            path,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TixError>;
