//! Keeping the cache coherent with the ticket directory.
//!
//! Freshness is judged from a [`DirSnapshot`]: the directory's mtime and
//! the number of ticket files in it. Creating, renaming over, or deleting a
//! ticket moves the directory mtime, so a matching snapshot means the set of
//! files and their inodes are what the cache saw.
//!
//! The cache's own atomic rename moves the directory mtime too, so the
//! snapshot written inside the file can only be the pre-commit observation.
//! After a coherent commit the cache file's own mtime is set to the
//! post-commit directory mtime (the "stamp"), and a cache is fresh when the
//! entry count matches and the directory mtime equals either value. Images
//! written without proof of coherence carry an empty snapshot and an epoch
//! stamp, so the next reader rescans.
//!
//! A snapshot is only recorded if its file count equals the number of files
//! the cache accounts for and the directory still matches it right before
//! the commit. A ticket another process wrote in the meantime therefore
//! leaves the image stale instead of hidden.
//!
//! Edits that rewrite a ticket in place without replacing the file do not
//! move the directory mtime and are not detected.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::{Result, TixError};
use crate::lock::LockManager;
use crate::ticket::parse_summary;
use crate::utils::dir_scanner::{find_ticket_files, mtime_ns, scan_with_mtime};

use super::codec;
use super::paths::cache_path;
use super::{CacheEntry, InvalidFile, TicketCache};

/// Directory mtime and ticket file count at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirSnapshot {
    pub mtime_ns: i64,
    pub entries: u64,
}

impl DirSnapshot {
    pub fn observe(dir: &Path) -> Result<Self> {
        let meta = fs::metadata(dir).map_err(TixError::storage("stat", dir))?;
        let mtime = meta.modified().map_err(TixError::storage("stat", dir))?;
        let entries = find_ticket_files(dir).map_err(TixError::storage("scan", dir))?;
        Ok(DirSnapshot {
            mtime_ns: mtime_ns(mtime),
            entries: entries.len() as u64,
        })
    }
}

/// Cache state as reported by `tix cache status`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub valid: bool,
    pub fresh: bool,
    pub entries: usize,
    pub invalid: usize,
    pub size_bytes: u64,
}

impl TicketCache {
    /// Whether this cache reflects a directory currently at `now`.
    pub fn is_fresh(&self, now: DirSnapshot) -> bool {
        let snapshot = self.snapshot();
        now.entries == snapshot.entries
            && (now.mtime_ns == snapshot.mtime_ns || now.mtime_ns == self.stamp_ns())
    }

    /// Read the cache file without locking.
    ///
    /// Returns `None` when there is no usable cache; integrity failures are
    /// logged and treated the same as a missing file.
    pub fn load(dir: &Path) -> Option<TicketCache> {
        let path = cache_path(dir);
        match read_image(&path) {
            Ok(Some((bytes, stamp_ns))) => match codec::decode(&bytes) {
                Ok(mut cache) => {
                    cache.set_stamp_ns(stamp_ns);
                    Some(cache)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt cache");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read cache, rebuilding");
                None
            }
        }
    }

    /// Open the cache for `dir`, rescanning if it is missing or stale.
    ///
    /// A fresh cache is returned without reading any ticket file or taking
    /// any lock. Otherwise the cache lock is taken, the cache re-read (another
    /// process may have just refreshed it), and the directory rescanned.
    pub fn open_coherent(dir: &Path, locks: &LockManager) -> Result<TicketCache> {
        if let Some(cache) = Self::load(dir)
            && cache.is_fresh(DirSnapshot::observe(dir)?)
        {
            debug!(entries = cache.len(), "cache is fresh");
            return Ok(cache);
        }

        locks.with_cache_lock(|| {
            let before = DirSnapshot::observe(dir)?;
            let mut cache = match Self::load(dir) {
                Some(cache) if cache.is_fresh(before) => {
                    debug!("cache refreshed by another process");
                    return Ok(cache);
                }
                Some(cache) => cache,
                None => TicketCache::default(),
            };
            cache.rescan(dir)?;
            cache.persist(dir, Some(before))?;
            Ok(cache)
        })
    }

    /// Bring the cache up to date with the files in `dir`.
    ///
    /// Entries whose file mtime is unchanged are kept as they are; new and
    /// changed files are parsed, vanished files dropped.
    pub fn rescan(&mut self, dir: &Path) -> Result<()> {
        let files = scan_with_mtime(dir).map_err(TixError::storage("scan", dir))?;
        let (old_entries, old_invalid) = self.take_contents();

        let mut old_entries: HashMap<String, CacheEntry> = old_entries
            .into_iter()
            .map(|e| (e.filename().to_string(), e))
            .collect();
        let mut old_invalid: HashMap<String, InvalidFile> = old_invalid
            .into_iter()
            .map(|f| (f.filename.clone(), f))
            .collect();

        let mut entries = Vec::with_capacity(files.len());
        let mut invalid = Vec::new();
        let mut parsed = 0usize;

        for file in files {
            if let Some(entry) = old_entries.remove(&file.filename)
                && entry.mtime_ns == file.mtime_ns
            {
                entries.push(entry);
                continue;
            }
            if let Some(known) = old_invalid.remove(&file.filename)
                && known.mtime_ns == file.mtime_ns
            {
                invalid.push(known);
                continue;
            }

            parsed += 1;
            let path = dir.join(&file.filename);
            let result = match fs::read_to_string(&path) {
                Ok(content) => parse_summary(&file.filename, &content),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(TixError::storage("read", &path)(e)),
            };

            match result {
                Ok(summary) => entries.push(CacheEntry {
                    mtime_ns: file.mtime_ns,
                    summary,
                }),
                Err(e) => {
                    debug!(file = %file.filename, error = %e, "skipping unparseable ticket");
                    invalid.push(InvalidFile {
                        filename: file.filename,
                        mtime_ns: file.mtime_ns,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(
            entries = entries.len(),
            invalid = invalid.len(),
            parsed,
            dropped = old_entries.len() + old_invalid.len(),
            "rescanned ticket directory"
        );
        *self = TicketCache::from_entries(entries, invalid);
        Ok(())
    }

    /// Number of ticket files this cache accounts for, parseable or not.
    fn file_count(&self) -> u64 {
        (self.len() + self.invalid().len()) as u64
    }

    /// Write the cache atomically. Must be called under the cache lock.
    ///
    /// `snapshot` is the directory state the contents are known to match.
    /// It is recorded, and the image stamped with the post-commit directory
    /// mtime, only while the directory still shows that state and its file
    /// count agrees with the cache. Otherwise the image is marked stale.
    pub fn persist(&mut self, dir: &Path, snapshot: Option<DirSnapshot>) -> Result<()> {
        let snapshot = match snapshot {
            Some(s) => {
                let current = DirSnapshot::observe(dir)?;
                if s.entries == self.file_count() && current == s {
                    Some(s)
                } else {
                    debug!(
                        expected = s.entries,
                        cached = self.file_count(),
                        found = current.entries,
                        "directory moved under the cache, marking stale"
                    );
                    None
                }
            }
            None => None,
        };
        self.set_snapshot(snapshot.unwrap_or_default());

        let path = cache_path(dir);
        let bytes = codec::encode(self)?;
        crate::fs::write_atomic(&path, &bytes)?;

        let stamp_ns = match snapshot {
            Some(s) => {
                let after = DirSnapshot::observe(dir)?;
                if after.entries == s.entries { after.mtime_ns } else { 0 }
            }
            None => 0,
        };
        set_mtime(&path, stamp_ns)?;
        self.set_stamp_ns(stamp_ns);

        debug!(entries = self.len(), coherent = stamp_ns != 0, "persisted cache");
        Ok(())
    }

    /// Fold a just-written ticket into the on-disk cache.
    ///
    /// `before` and `after` are the directory snapshots observed around the
    /// ticket write. Without an existing cache this does nothing; the next
    /// reader builds one from scratch.
    pub fn write_through(
        dir: &Path,
        locks: &LockManager,
        entry: CacheEntry,
        before: DirSnapshot,
        after: DirSnapshot,
    ) -> Result<()> {
        locks.with_cache_lock(|| {
            let Some(mut cache) = Self::load(dir) else {
                debug!(file = %entry.filename(), "no cache to write through");
                return Ok(());
            };
            let snapshot = cache.is_fresh(before).then_some(after);
            cache.update(entry);
            cache.persist(dir, snapshot)
        })
    }

    /// Rebuild from scratch, ignoring any existing cache file.
    pub fn rebuild(dir: &Path, locks: &LockManager) -> Result<TicketCache> {
        locks.with_cache_lock(|| {
            let before = DirSnapshot::observe(dir)?;
            let mut cache = TicketCache::default();
            cache.rescan(dir)?;
            cache.persist(dir, Some(before))?;
            Ok(cache)
        })
    }

    /// Delete the cache file. Returns whether one existed.
    pub fn clear(dir: &Path, locks: &LockManager) -> Result<bool> {
        locks.with_cache_lock(|| crate::fs::remove_if_exists(&cache_path(dir)))
    }

    pub fn status(dir: &Path) -> Result<CacheStatus> {
        let path = cache_path(dir);
        let size_bytes = match fs::metadata(&path) {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(TixError::storage("stat", &path)(e)),
        };

        let cache = size_bytes.and_then(|_| Self::load(dir));
        let fresh = match &cache {
            Some(cache) => cache.is_fresh(DirSnapshot::observe(dir)?),
            None => false,
        };

        Ok(CacheStatus {
            exists: size_bytes.is_some(),
            valid: cache.is_some(),
            fresh,
            entries: cache.as_ref().map_or(0, TicketCache::len),
            invalid: cache.as_ref().map_or(0, |c| c.invalid().len()),
            size_bytes: size_bytes.unwrap_or(0),
            path,
        })
    }
}

/// Read the cache bytes and the file's own mtime from one open handle.
fn read_image(path: &Path) -> io::Result<Option<(Vec<u8>, i64)>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let stamp_ns = mtime_ns(file.metadata()?.modified()?);
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some((bytes, stamp_ns)))
}

fn set_mtime(path: &Path, mtime_ns: i64) -> Result<()> {
    let time = UNIX_EPOCH + Duration::from_nanos(u64::try_from(mtime_ns).unwrap_or(0));
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .map_err(TixError::storage("stamp", path))
}
