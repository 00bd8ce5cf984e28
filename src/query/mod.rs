//! Listing tickets out of a [`TicketCache`].
//!
//! Everything here works on an immutable, already-coherent cache; opening
//! and refreshing it is the store's job.

use std::path::PathBuf;

use serde::Serialize;

use crate::cache::TicketCache;
use crate::error::{Result, TixError};
use crate::types::Summary;

mod ready;

pub use crate::cache::Filter;
pub use ready::ready;

/// A non-fatal problem found while answering a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// File the warning is about, relative to the ticket directory.
    pub path: PathBuf,
    pub message: String,
}

/// Query result: matching summaries plus anything worth telling the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub tickets: Vec<Summary>,
    pub warnings: Vec<Warning>,
}

/// One warning per file the cache could not parse.
pub fn invalid_file_warnings(cache: &TicketCache) -> Vec<Warning> {
    cache
        .invalid()
        .iter()
        .map(|f| Warning {
            path: PathBuf::from(&f.filename),
            message: f.error.clone(),
        })
        .collect()
}

/// Tickets matching `filter` in id order, paginated.
///
/// `limit == 0` means no limit. An offset at or past the end of a non-empty
/// result is an error rather than an empty page.
pub fn list(cache: &TicketCache, filter: &Filter, limit: usize, offset: usize) -> Result<Listing> {
    if filter.parent.is_some() && filter.roots {
        return Err(TixError::ConflictingFilters(
            "--parent and --roots cannot be combined".to_string(),
        ));
    }

    let positions = cache.query(filter);
    if !positions.is_empty() && offset >= positions.len() {
        return Err(TixError::OffsetOutOfBounds {
            offset,
            total: positions.len(),
        });
    }

    let take = if limit == 0 { usize::MAX } else { limit };
    let tickets = positions
        .into_iter()
        .skip(offset)
        .take(take)
        .filter_map(|pos| cache.entry_at(pos))
        .map(|e| e.summary.clone())
        .collect();

    Ok(Listing {
        tickets,
        warnings: invalid_file_warnings(cache),
    })
}
