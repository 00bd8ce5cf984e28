//! Advisory inter-process locks.
//!
//! One lock file per key under `<ticket-dir>/.locks/`: `<id>.md.lock` for a
//! ticket, `.cache.lock` for the cache and `.graph.lock` for edits that add
//! blocker edges. Locks are exclusive and whole-file (`flock` on Unix).
//! Nested locks are always taken in the order graph, ticket, cache.
//!
//! Lock files are removed on release. Removal happens while the lock is still
//! held, so a waiter that was blocked on the old file wakes up holding a lock
//! on an unlinked inode; acquisition therefore re-checks that the path still
//! names the locked file and starts over if it does not.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{Result, TixError};

/// Name of the lock directory inside the ticket directory.
pub const LOCKS_DIR: &str = ".locks";

const LOCK_SUFFIX: &str = ".lock";
const CACHE_LOCK_KEY: &str = ".cache";
const GRAPH_LOCK_KEY: &str = ".graph";

#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
}

impl LockManager {
    /// Lock manager for `ticket_dir`, creating its lock directory if needed.
    pub fn open(ticket_dir: &Path) -> Result<Self> {
        let dir = ticket_dir.join(LOCKS_DIR);
        crate::fs::ensure_dir(&dir)?;
        Ok(LockManager { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run `f` while holding the exclusive lock for `key`.
    ///
    /// The lock is released when `f` returns, fails or panics. Waits without
    /// a timeout.
    pub fn with_lock<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _guard = self.acquire(key)?;
        f()
    }

    /// Run `f` while holding the lock for the ticket with this id.
    pub fn with_ticket_lock<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.with_lock(&crate::types::ticket_filename(id), f)
    }

    /// Run `f` while holding the cache lock.
    pub fn with_cache_lock<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.with_lock(CACHE_LOCK_KEY, f)
    }

    /// Run `f` while holding the blocker graph lock.
    ///
    /// Every edit that adds a blocker edge holds it across its cycle check
    /// and write, so two such edits never judge the graph concurrently.
    pub fn with_graph_lock<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.with_lock(GRAPH_LOCK_KEY, f)
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{LOCK_SUFFIX}"))
    }

    fn acquire(&self, key: &str) -> Result<LockGuard> {
        let path = self.lock_path(key);

        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(TixError::storage("open lock file", &path))?;

            if file.try_lock_exclusive().is_err() {
                debug!(lock = %path.display(), "waiting for lock");
                file.lock_exclusive()
                    .map_err(TixError::storage("lock", &path))?;
            }

            if names_same_file(&file, &path).map_err(TixError::storage("stat", &path))? {
                debug!(lock = %path.display(), "lock acquired");
                return Ok(LockGuard { file, path });
            }

            // the previous holder unlinked the file while we waited on it
            debug!(lock = %path.display(), "lock file replaced, retrying");
        }
    }
}

/// Held lock; releasing it deletes the lock file and then unlocks.
#[derive(Debug)]
struct LockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(lock = %self.path.display(), error = %e, "failed to remove lock file");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(lock = %self.path.display(), error = %e, "failed to unlock");
        }
    }
}

#[cfg(unix)]
fn names_same_file(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn names_same_file(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn lock_files(manager: &LockManager) -> Vec<String> {
        fs::read_dir(manager.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_lock_file_removed_after_release() {
        let tmp = TempDir::new().unwrap();
        let manager = LockManager::open(tmp.path()).unwrap();

        let seen = manager
            .with_ticket_lock("abc", || Ok(manager.dir().join("abc.md.lock").exists()))
            .unwrap();
        assert!(seen);
        assert!(lock_files(&manager).is_empty());
    }

    #[test]
    fn test_lock_released_on_error() {
        let tmp = TempDir::new().unwrap();
        let manager = LockManager::open(tmp.path()).unwrap();

        let result: Result<()> =
            manager.with_cache_lock(|| Err(TixError::TicketNotFound("x".to_string())));
        assert!(result.is_err());
        assert!(lock_files(&manager).is_empty());

        // lock is available again
        manager.with_cache_lock(|| Ok(())).unwrap();
    }

    #[test]
    fn test_lock_released_on_panic() {
        let tmp = TempDir::new().unwrap();
        let manager = LockManager::open(tmp.path()).unwrap();

        let result = std::panic::catch_unwind(|| {
            let _: Result<()> = manager.with_lock("k", || panic!("boom"));
        });
        assert!(result.is_err());
        assert!(lock_files(&manager).is_empty());
        manager.with_lock("k", || Ok(())).unwrap();
    }

    #[test]
    fn test_lock_is_exclusive_across_threads() {
        let tmp = TempDir::new().unwrap();
        let manager = Arc::new(LockManager::open(tmp.path()).unwrap());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..5 {
                        manager
                            .with_lock("shared", || {
                                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                                max_inside.fetch_max(now, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(1));
                                inside.fetch_sub(1, Ordering::SeqCst);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(lock_files(&manager).is_empty());
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let tmp = TempDir::new().unwrap();
        let manager = LockManager::open(tmp.path()).unwrap();

        manager
            .with_ticket_lock("a", || manager.with_cache_lock(|| Ok(())))
            .unwrap();
        assert!(lock_files(&manager).is_empty());
    }

    #[test]
    fn test_graph_lock_nests_outside_ticket_and_cache() {
        let tmp = TempDir::new().unwrap();
        let manager = LockManager::open(tmp.path()).unwrap();

        let held = manager
            .with_graph_lock(|| {
                manager.with_ticket_lock("a", || {
                    manager.with_cache_lock(|| {
                        let mut files = lock_files(&manager);
                        files.sort();
                        Ok(files)
                    })
                })
            })
            .unwrap();
        assert_eq!(held, vec![".cache.lock", ".graph.lock", "a.md.lock"]);
        assert!(lock_files(&manager).is_empty());
    }
}
