//! Atomic file I/O.
//!
//! Every ticket and cache write goes through a temp file in the target's own
//! directory that is fsynced and renamed over the target, so readers see
//! either the old bytes or the new bytes, never a partial file.

use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, TixError};

/// Replace `path` with `content` atomically.
///
/// The temp file is named `<filename>.tmp.<nonce>`; it is removed on every
/// failure path.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp = write_temp(path, content)?;
    temp.persist(path)
        .map_err(|e| TixError::storage("rename", path)(e.error))?;
    sync_parent_dir(path)
}

/// Create `path` atomically, refusing to replace an existing file.
///
/// Fails with an `io::ErrorKind::AlreadyExists` storage error when the
/// target already exists; see [`is_already_exists`].
pub fn create_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp = write_temp(path, content)?;
    temp.persist_noclobber(path)
        .map_err(|e| TixError::storage("create", path)(e.error))?;
    sync_parent_dir(path)
}

/// True if the error is a failed no-clobber create.
pub fn is_already_exists(err: &TixError) -> bool {
    match err {
        TixError::Storage { source, .. } | TixError::Io(source) => {
            source.kind() == io::ErrorKind::AlreadyExists
        }
        _ => false,
    }
}

/// Create a directory and all its ancestors.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(TixError::storage("create directory", path))
}

/// Remove a file, treating a missing file as success.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(TixError::storage("delete", path)(e)),
    }
}

fn write_temp(path: &Path, content: &[u8]) -> Result<tempfile::NamedTempFile> {
    let dir = parent_dir(path);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{filename}.tmp."))
        .rand_bytes(8)
        .tempfile_in(dir)
        .map_err(TixError::storage("create temp file in", dir))?;

    // dropping `temp` on error deletes it
    temp.write_all(content)
        .map_err(TixError::storage("write", temp.path().to_path_buf()))?;
    temp.as_file()
        .sync_all()
        .map_err(TixError::storage("sync", temp.path().to_path_buf()))?;
    Ok(temp)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Persist the rename itself by syncing the containing directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(TixError::storage("sync directory", dir))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
