use std::path::PathBuf;

use crate::types::{TICKETS_ITEMS_DIR, TIX_DIR};

/// Environment variable overriding the tix root directory.
pub const ROOT_ENV_VAR: &str = "TIX_ROOT";

/// Returns the root tix directory path.
///
/// Resolution order:
/// 1. `TIX_ROOT` environment variable (if set and non-empty)
/// 2. Current working directory + `.tix`
pub fn tix_root() -> PathBuf {
    match std::env::var(ROOT_ENV_VAR) {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => PathBuf::from(TIX_DIR),
    }
}

/// Returns the path to the tickets items directory.
pub fn tickets_items_dir() -> PathBuf {
    tix_root().join(TICKETS_ITEMS_DIR)
}

/// Returns the path to the configuration file.
pub fn config_path() -> PathBuf {
    tix_root().join("config.yaml")
}
