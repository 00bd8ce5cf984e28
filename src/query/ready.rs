//! Tickets that can be worked on right now.
//!
//! A ticket is ready when it is open, every ticket in its `blocked-by` list
//! is closed, and it either has no parent or its parent is in progress.
//! Dangling references are reported and then ignored: a missing blocker
//! counts as resolved, a missing parent as no parent. Every dangling
//! reference of an open ticket is reported, whether or not it is ready.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use crate::cache::{Filter, TicketCache};
use crate::types::{Summary, TicketStatus};

use super::{Listing, Warning, invalid_file_warnings};

/// Candidates per worker; smaller inputs are checked on the calling thread.
const CHUNK_SIZE: usize = 512;

/// Ready tickets ordered by priority, then id. `limit == 0` means no limit.
pub fn ready(cache: &TicketCache, limit: usize) -> Listing {
    let open = cache.query(&Filter {
        status: Some(TicketStatus::Open),
        ..Default::default()
    });

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    let chunk = open.len().div_ceil(workers).max(CHUNK_SIZE);

    let results: Vec<(Vec<Summary>, Vec<Warning>)> = if open.len() <= chunk {
        vec![check_positions(cache, &open)]
    } else {
        thread::scope(|s| {
            let handles: Vec<_> = open
                .chunks(chunk)
                .map(|part| s.spawn(move || check_positions(cache, part)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    };

    let mut tickets = Vec::new();
    let mut warnings = invalid_file_warnings(cache);
    for (ready, warned) in results {
        tickets.extend(ready);
        warnings.extend(warned);
    }

    tickets.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    if limit > 0 {
        tickets.truncate(limit);
    }

    Listing { tickets, warnings }
}

fn check_positions(cache: &TicketCache, positions: &[usize]) -> (Vec<Summary>, Vec<Warning>) {
    let mut ready = Vec::new();
    let mut warnings = Vec::new();

    for entry in positions.iter().filter_map(|&pos| cache.entry_at(pos)) {
        if is_ready(cache, &entry.summary, &mut warnings) {
            ready.push(entry.summary.clone());
        }
    }
    (ready, warnings)
}

fn is_ready(cache: &TicketCache, ticket: &Summary, warnings: &mut Vec<Warning>) -> bool {
    let mut warn = |message: String| {
        warnings.push(Warning {
            path: PathBuf::from(&ticket.filename),
            message,
        })
    };

    let mut blocked = false;
    for blocker in &ticket.blocked_by {
        match cache.get(blocker) {
            Some(b) => blocked |= b.status != TicketStatus::Closed,
            None => warn(format!(
                "blocker '{blocker}' not found, treating it as resolved"
            )),
        }
    }

    let parent_ok = match ticket.parent.as_deref() {
        None => true,
        Some(parent) => match cache.get(parent) {
            Some(p) => p.status == TicketStatus::InProgress,
            None => {
                warn(format!("parent '{parent}' not found, treating the ticket as a root"));
                true
            }
        },
    };

    !blocked && parent_ok
}
