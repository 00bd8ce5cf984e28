//! Status transitions and blocker edits on a single ticket document.
//!
//! These functions only check and edit the document they are given. The
//! caller supplies anything that needs other tickets (parent status, blocker
//! existence) and runs them under the ticket lock.

use jiff::Timestamp;

use crate::error::{Result, TixError};
use crate::parser::Document;
use crate::types::{FIELD_CLOSED, Summary, TicketStatus};

/// What is known about a ticket's parent when starting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentState {
    None,
    Missing,
    Status(TicketStatus),
}

/// `open -> in_progress`. A parent, if set, must exist and be in progress.
pub fn start(doc: &mut Document, current: &Summary, parent: ParentState) -> Result<()> {
    match current.status {
        TicketStatus::Open => {}
        TicketStatus::InProgress => return Err(TixError::AlreadyInProgress(current.id.clone())),
        TicketStatus::Closed => {
            return Err(TixError::NotOpen {
                id: current.id.clone(),
                status: current.status,
            });
        }
    }

    if let Some(parent_id) = &current.parent {
        match parent {
            ParentState::None | ParentState::Missing => {
                return Err(TixError::ParentNotFound(parent_id.clone()));
            }
            ParentState::Status(TicketStatus::InProgress) => {}
            ParentState::Status(TicketStatus::Closed) => {
                return Err(TixError::ParentClosed {
                    id: current.id.clone(),
                    parent: parent_id.clone(),
                });
            }
            ParentState::Status(status) => {
                return Err(TixError::ParentNotStarted {
                    id: current.id.clone(),
                    parent: parent_id.clone(),
                    status,
                });
            }
        }
    }

    doc.set_status(TicketStatus::InProgress);
    Ok(())
}

/// `in_progress -> closed`, stamping `closed` with `now` to the second.
pub fn close(doc: &mut Document, current: &Summary, now: Timestamp) -> Result<()> {
    match current.status {
        TicketStatus::InProgress => {}
        TicketStatus::Closed => return Err(TixError::AlreadyClosed(current.id.clone())),
        TicketStatus::Open => {
            return Err(TixError::NotInProgress {
                id: current.id.clone(),
                status: current.status,
            });
        }
    }

    let closed = super::whole_seconds(now);
    doc.set_status(TicketStatus::Closed);
    doc.set_field(FIELD_CLOSED, &closed.to_string());
    Ok(())
}

/// `closed -> open`, dropping the `closed` field.
pub fn reopen(doc: &mut Document, current: &Summary) -> Result<()> {
    match current.status {
        TicketStatus::Closed => {}
        TicketStatus::Open => return Err(TixError::AlreadyOpen(current.id.clone())),
        TicketStatus::InProgress => {
            return Err(TixError::NotClosed {
                id: current.id.clone(),
                status: current.status,
            });
        }
    }

    doc.set_status(TicketStatus::Open);
    doc.remove_field(FIELD_CLOSED);
    Ok(())
}

/// Append `blocker` to `blocked-by`. Existence and cycle checks are the
/// caller's; this only rejects self-blocking and duplicates.
pub fn block(doc: &mut Document, current: &Summary, blocker: &str) -> Result<()> {
    if blocker == current.id {
        return Err(TixError::CannotBlockSelf(current.id.clone()));
    }
    if current.blocked_by.iter().any(|b| b == blocker) {
        return Err(TixError::AlreadyBlockedBy {
            id: current.id.clone(),
            blocker: blocker.to_string(),
        });
    }

    let mut blocked_by = current.blocked_by.clone();
    blocked_by.push(blocker.to_string());
    doc.set_blocked_by(&blocked_by);
    Ok(())
}

/// Remove `blocker` from `blocked-by`.
pub fn unblock(doc: &mut Document, current: &Summary, blocker: &str) -> Result<()> {
    if current.status == TicketStatus::Closed {
        return Err(TixError::AlreadyClosed(current.id.clone()));
    }
    if !current.blocked_by.iter().any(|b| b == blocker) {
        return Err(TixError::NotBlockedBy {
            id: current.id.clone(),
            blocker: blocker.to_string(),
        });
    }

    let blocked_by: Vec<String> = current
        .blocked_by
        .iter()
        .filter(|b| *b != blocker)
        .cloned()
        .collect();
    doc.set_blocked_by(&blocked_by);
    Ok(())
}
