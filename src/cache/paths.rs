//! Cache file location.
//!
//! The cache lives next to the tickets it indexes, as a hidden file the
//! directory scan never mistakes for a ticket.

use std::path::{Path, PathBuf};

/// Name of the cache file inside the ticket directory.
pub const CACHE_FILENAME: &str = ".cache";

pub fn cache_path(ticket_dir: &Path) -> PathBuf {
    ticket_dir.join(CACHE_FILENAME)
}
