pub mod dir_scanner;
pub mod id;

use std::path::Path;

use crate::error::{Result, TixError};

pub use dir_scanner::{ScannedFile, scan_with_mtime};

/// Validate that a user-supplied ticket id is safe to use as a file stem.
///
/// Accepts ASCII letters, digits, `-` and `_`. Rejects anything that could
/// escape the ticket directory or name a hidden file.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(TixError::InvalidId(id.to_string()))
    }
}

/// Format a path for user-facing messages relative to `base`.
pub fn format_relative_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}
