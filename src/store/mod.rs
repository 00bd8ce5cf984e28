//! Caller-facing ticket store.
//!
//! A [`TicketStore`] is bound to one ticket directory. Mutations follow one
//! path: ticket lock, read, edit, validate, atomic write, then cache
//! write-through while still holding the ticket lock. Reads go through the
//! coherent cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStatus, DirSnapshot, TicketCache, cache_path};
use crate::error::{Result, TixError};
use crate::graph::check_blocker_cycle;
use crate::lock::LockManager;
use crate::parser::Document;
use crate::query::{self, Filter, Listing};
use crate::ticket::{NewTicket, ParentState, parse_summary, summary_from_document, transition};
use crate::types::{Summary, ticket_filename};
use crate::utils::dir_scanner::mtime_ns;
use crate::utils::id::{self, ClaimError};
use crate::utils::validate_id;

#[derive(Debug, Clone)]
pub struct TicketStore {
    dir: PathBuf,
    locks: LockManager,
}

impl TicketStore {
    /// Open the store rooted at `dir`, creating it and its lock directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        crate::fs::ensure_dir(&dir)?;
        let locks = LockManager::open(&dir)?;
        Ok(TicketStore { dir, locks })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ticket_path(&self, id: &str) -> PathBuf {
        self.dir.join(ticket_filename(id))
    }

    pub fn cache_path(&self) -> PathBuf {
        cache_path(&self.dir)
    }

    /// The cache, refreshed against the directory if it is stale.
    pub fn cache(&self) -> Result<TicketCache> {
        TicketCache::open_coherent(&self.dir, &self.locks)
    }

    /// Create a ticket under a freshly allocated id.
    pub fn create(&self, ticket: &NewTicket) -> Result<(String, PathBuf)> {
        ticket.validate()?;
        if let Some(parent) = ticket.parent_id()
            && !self.ticket_path(parent).exists()
        {
            return Err(TixError::ParentNotFound(parent.to_string()));
        }

        let before = DirSnapshot::observe(&self.dir)?;
        let (id, path, summary) = id::allocate(&self.dir, |candidate| {
            let content = ticket.render(candidate, Timestamp::now())?;
            let path = self.ticket_path(candidate);
            match crate::fs::create_atomic(&path, content.as_bytes()) {
                Ok(()) => {}
                Err(e) if crate::fs::is_already_exists(&e) => return Err(ClaimError::Taken),
                Err(e) => return Err(e.into()),
            }
            let summary = parse_summary(&ticket_filename(candidate), &content)?;
            Ok((candidate.to_string(), path, summary))
        })?;

        let after = DirSnapshot::observe(&self.dir)?;
        debug!(%id, "created ticket");
        self.write_through(&path, summary, before, after)?;
        Ok((id, path))
    }

    /// Rewrite a ticket's raw content under its lock.
    ///
    /// The result of `f` must still parse as a valid ticket with the same
    /// id. Output identical to the input is not written.
    pub fn mutate_raw<F>(&self, id: &str, f: F) -> Result<Summary>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        validate_id(id)?;
        let path = self.ticket_path(id);
        let filename = ticket_filename(id);

        self.locks.with_ticket_lock(id, || {
            let content = self.read_ticket(id)?;
            let updated = f(&content)?;
            let summary = parse_summary(&filename, &updated)?;
            if updated == content {
                debug!(%id, "ticket unchanged, skipping write");
                return Ok(summary);
            }

            let before = DirSnapshot::observe(&self.dir)?;
            crate::fs::write_atomic(&path, updated.as_bytes())?;
            let after = DirSnapshot::observe(&self.dir)?;
            self.write_through(&path, summary.clone(), before, after)?;
            Ok(summary)
        })
    }

    /// Edit a ticket's parsed document under its lock.
    pub fn mutate<F>(&self, id: &str, f: F) -> Result<Summary>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        self.mutate_raw(id, |content| {
            let mut doc = Document::parse(content)?;
            f(&mut doc)?;
            Ok(doc.emit())
        })
    }

    pub fn list(&self, filter: &Filter, limit: usize, offset: usize) -> Result<Listing> {
        query::list(&self.cache()?, filter, limit, offset)
    }

    pub fn ready(&self, limit: usize) -> Result<Listing> {
        Ok(query::ready(&self.cache()?, limit))
    }

    pub fn lookup(&self, id: &str) -> Result<Option<Summary>> {
        validate_id(id)?;
        Ok(self.cache()?.get(id).cloned())
    }

    /// Summary and full content of one ticket, read from its file.
    pub fn show(&self, id: &str) -> Result<(Summary, String)> {
        validate_id(id)?;
        let content = self.read_ticket(id)?;
        let summary = parse_summary(&ticket_filename(id), &content)?;
        Ok((summary, content))
    }

    pub fn start(&self, id: &str) -> Result<Summary> {
        self.transition(id, |doc, current| {
            let parent = self.parent_state(current.parent.as_deref())?;
            transition::start(doc, current, parent)
        })
    }

    pub fn close(&self, id: &str) -> Result<Summary> {
        self.transition(id, |doc, current| {
            transition::close(doc, current, Timestamp::now())
        })
    }

    pub fn reopen(&self, id: &str) -> Result<Summary> {
        self.transition(id, transition::reopen)
    }

    /// Add `blocker` to the `blocked-by` list of `id`.
    ///
    /// The cycle check and the write both happen under the graph lock, and
    /// every earlier edge addition has written through by the time it is
    /// released, so the cache read inside it sees the current graph.
    pub fn block(&self, id: &str, blocker: &str) -> Result<Summary> {
        validate_id(blocker)?;
        if id == blocker {
            return Err(TixError::CannotBlockSelf(id.to_string()));
        }
        if !self.ticket_path(blocker).exists() {
            return Err(TixError::BlockerNotFound(blocker.to_string()));
        }

        self.locks.with_graph_lock(|| {
            let cache = self.cache()?;
            self.transition(id, |doc, current| {
                check_blocker_cycle(id, blocker, |t| {
                    cache.get(t).map(|s| s.blocked_by.clone())
                })?;
                transition::block(doc, current, blocker)
            })
        })
    }

    pub fn unblock(&self, id: &str, blocker: &str) -> Result<Summary> {
        self.transition(id, |doc, current| transition::unblock(doc, current, blocker))
    }

    pub fn cache_status(&self) -> Result<CacheStatus> {
        TicketCache::status(&self.dir)
    }

    pub fn rebuild_cache(&self) -> Result<TicketCache> {
        TicketCache::rebuild(&self.dir, &self.locks)
    }

    pub fn clear_cache(&self) -> Result<bool> {
        TicketCache::clear(&self.dir, &self.locks)
    }

    fn transition<F>(&self, id: &str, f: F) -> Result<Summary>
    where
        F: FnOnce(&mut Document, &Summary) -> Result<()>,
    {
        let filename = ticket_filename(id);
        self.mutate(id, |doc| {
            let current = summary_from_document(&filename, doc)?;
            f(doc, &current)
        })
    }

    fn parent_state(&self, parent: Option<&str>) -> Result<ParentState> {
        let Some(parent) = parent else {
            return Ok(ParentState::None);
        };
        match fs::read_to_string(self.ticket_path(parent)) {
            Ok(content) => {
                let summary = parse_summary(&ticket_filename(parent), &content)?;
                Ok(ParentState::Status(summary.status))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ParentState::Missing),
            Err(e) => Err(TixError::storage("read", self.ticket_path(parent))(e)),
        }
    }

    fn read_ticket(&self, id: &str) -> Result<String> {
        let path = self.ticket_path(id);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TixError::TicketNotFound(id.to_string()),
            _ => TixError::storage("read", &path)(e),
        })
    }

    fn write_through(
        &self,
        path: &Path,
        summary: Summary,
        before: DirSnapshot,
        after: DirSnapshot,
    ) -> Result<()> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(TixError::storage("stat", path))?;
        let entry = CacheEntry {
            mtime_ns: mtime_ns(modified),
            summary,
        };
        TicketCache::write_through(&self.dir, &self.locks, entry, before, after)
    }
}
