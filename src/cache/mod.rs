//! In-memory view of the ticket cache.
//!
//! [`TicketCache`] holds one [`CacheEntry`] per parseable ticket file, kept
//! in filename order (which is id order), plus bitmap indexes over the
//! entry positions:
//!
//! - one bitmap per status, priority and type value
//! - a parent id -> child positions index
//! - a bitmap of root tickets (no parent)
//!
//! Files that failed to parse are kept separately so every reader reports
//! the same warnings whether or not the cache was warm.
//!
//! The on-disk format lives in [`codec`], coherency with the ticket
//! directory in [`sync`].

pub mod bitmap;
pub mod codec;
pub mod paths;
pub mod sync;

use std::collections::{BTreeMap, HashMap};

use crate::types::{Summary, TicketPriority, TicketStatus, TicketType, ticket_filename};

pub use bitmap::Bitmap;
pub use paths::{CACHE_FILENAME, cache_path};
pub use sync::{CacheStatus, DirSnapshot};

/// A value with a dedicated bitmap per variant.
pub trait Indexed: Copy + Eq + 'static {
    const ALL: &'static [Self];

    fn index(self) -> usize;
}

impl Indexed for TicketStatus {
    const ALL: &'static [Self] = &TicketStatus::ALL;

    fn index(self) -> usize {
        self as usize
    }
}

impl Indexed for TicketPriority {
    const ALL: &'static [Self] = &TicketPriority::ALL;

    fn index(self) -> usize {
        self as usize
    }
}

impl Indexed for TicketType {
    const ALL: &'static [Self] = &TicketType::ALL;

    fn index(self) -> usize {
        self as usize
    }
}

/// One cached ticket: its summary and the file mtime it was parsed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub mtime_ns: i64,
    pub summary: Summary,
}

impl CacheEntry {
    pub fn filename(&self) -> &str {
        &self.summary.filename
    }
}

/// A ticket file that could not be parsed, with the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFile {
    pub filename: String,
    pub mtime_ns: i64,
    pub error: String,
}

/// Index-level predicate. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub ticket_type: Option<TicketType>,
    pub parent: Option<String>,
    pub roots: bool,
}

impl Filter {
    /// Whether a summary satisfies this filter, checked field by field.
    pub fn matches(&self, summary: &Summary) -> bool {
        self.status.is_none_or(|s| summary.status == s)
            && self.priority.is_none_or(|p| summary.priority == p)
            && self.ticket_type.is_none_or(|t| summary.ticket_type == t)
            && self
                .parent
                .as_ref()
                .is_none_or(|p| summary.parent.as_ref() == Some(p))
            && (!self.roots || summary.parent.is_none())
    }
}

#[derive(Debug, Clone)]
pub struct TicketCache {
    snapshot: DirSnapshot,
    /// mtime of the cache file itself when loaded or last persisted
    stamp_ns: i64,
    entries: Vec<CacheEntry>,
    positions: HashMap<String, usize>,
    status_bm: Vec<Bitmap>,
    priority_bm: Vec<Bitmap>,
    type_bm: Vec<Bitmap>,
    children: BTreeMap<String, Vec<usize>>,
    roots: Bitmap,
    invalid: Vec<InvalidFile>,
}

impl Default for TicketCache {
    fn default() -> Self {
        let mut cache = TicketCache {
            snapshot: DirSnapshot::default(),
            stamp_ns: 0,
            entries: Vec::new(),
            positions: HashMap::new(),
            status_bm: Vec::new(),
            priority_bm: Vec::new(),
            type_bm: Vec::new(),
            children: BTreeMap::new(),
            roots: Bitmap::default(),
            invalid: Vec::new(),
        };
        cache.rebuild_indexes();
        cache
    }
}

impl TicketCache {
    /// Build a cache from entries in any order.
    pub fn from_entries(mut entries: Vec<CacheEntry>, mut invalid: Vec<InvalidFile>) -> Self {
        entries.sort_by(|a, b| a.filename().cmp(b.filename()));
        entries.dedup_by(|a, b| a.filename() == b.filename());
        invalid.sort_by(|a, b| a.filename.cmp(&b.filename));

        let mut cache = TicketCache {
            entries,
            invalid,
            ..Default::default()
        };
        cache.rebuild_indexes();
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> DirSnapshot {
        self.snapshot
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn invalid(&self) -> &[InvalidFile] {
        &self.invalid
    }

    pub fn entry_at(&self, pos: usize) -> Option<&CacheEntry> {
        self.entries.get(pos)
    }

    pub fn lookup(&self, filename: &str) -> Option<&CacheEntry> {
        self.positions.get(filename).map(|&pos| &self.entries[pos])
    }

    pub fn get(&self, id: &str) -> Option<&Summary> {
        self.lookup(&ticket_filename(id)).map(|e| &e.summary)
    }

    /// Summaries in filename order.
    pub fn iter(&self) -> impl Iterator<Item = &Summary> {
        self.entries.iter().map(|e| &e.summary)
    }

    pub fn status_bitmap(&self, status: TicketStatus) -> &Bitmap {
        &self.status_bm[status.index()]
    }

    pub fn priority_bitmap(&self, priority: TicketPriority) -> &Bitmap {
        &self.priority_bm[priority.index()]
    }

    pub fn type_bitmap(&self, ticket_type: TicketType) -> &Bitmap {
        &self.type_bm[ticket_type.index()]
    }

    pub fn children(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.children
    }

    pub fn roots(&self) -> &Bitmap {
        &self.roots
    }

    /// Positions matching `filter`, ascending.
    ///
    /// Indexed predicates are intersected word by word; with none set this
    /// is a plain scan of all positions.
    pub fn query(&self, filter: &Filter) -> Vec<usize> {
        let mut acc: Option<Bitmap> = None;

        if let Some(status) = filter.status {
            intersect(&mut acc, self.status_bitmap(status));
        }
        if let Some(priority) = filter.priority {
            intersect(&mut acc, self.priority_bitmap(priority));
        }
        if let Some(ticket_type) = filter.ticket_type {
            intersect(&mut acc, self.type_bitmap(ticket_type));
        }
        if let Some(parent) = &filter.parent {
            let mut incidence = Bitmap::new(self.len());
            for &pos in self.children.get(parent).into_iter().flatten() {
                incidence.set(pos);
            }
            intersect(&mut acc, &incidence);
        }
        if filter.roots {
            intersect(&mut acc, &self.roots);
        }

        match acc {
            Some(bm) => bm.iter_ones().collect(),
            None => (0..self.len()).collect(),
        }
    }

    /// Insert or replace the entry for its filename, keeping every index in
    /// step.
    pub fn update(&mut self, entry: CacheEntry) {
        let filename = entry.filename().to_string();
        self.invalid.retain(|f| f.filename != filename);

        if let Some(&pos) = self.positions.get(&filename) {
            let old = std::mem::replace(&mut self.entries[pos], entry);
            self.unindex(pos, &old.summary);
            self.index(pos);
            return;
        }

        let pos = self
            .entries
            .partition_point(|e| e.filename() < filename.as_str());
        if pos == self.entries.len() {
            // time-ordered ids normally land here
            self.entries.push(entry);
            self.positions.insert(filename, pos);
            self.resize_bitmaps(self.entries.len());
            self.index(pos);
        } else {
            self.entries.insert(pos, entry);
            self.rebuild_indexes();
        }
    }

    /// Recompute every index from the entries.
    pub fn rebuild_indexes(&mut self) {
        let n = self.entries.len();
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.filename().to_string(), pos))
            .collect();
        self.status_bm = vec![Bitmap::new(n); TicketStatus::ALL.len()];
        self.priority_bm = vec![Bitmap::new(n); TicketPriority::ALL.len()];
        self.type_bm = vec![Bitmap::new(n); TicketType::ALL.len()];
        self.children.clear();
        self.roots = Bitmap::new(n);

        for pos in 0..n {
            self.index(pos);
        }
    }

    fn resize_bitmaps(&mut self, n: usize) {
        for bm in self
            .status_bm
            .iter_mut()
            .chain(&mut self.priority_bm)
            .chain(&mut self.type_bm)
        {
            bm.resize(n);
        }
        self.roots.resize(n);
    }

    fn index(&mut self, pos: usize) {
        let summary = &self.entries[pos].summary;
        self.status_bm[summary.status.index()].set(pos);
        self.priority_bm[summary.priority.index()].set(pos);
        self.type_bm[summary.ticket_type.index()].set(pos);

        match &summary.parent {
            Some(parent) => {
                let list = self.children.entry(parent.clone()).or_default();
                let at = list.partition_point(|&p| p < pos);
                list.insert(at, pos);
            }
            None => self.roots.set(pos),
        }
    }

    fn unindex(&mut self, pos: usize, old: &Summary) {
        self.status_bm[old.status.index()].clear(pos);
        self.priority_bm[old.priority.index()].clear(pos);
        self.type_bm[old.ticket_type.index()].clear(pos);

        match &old.parent {
            Some(parent) => {
                if let Some(list) = self.children.get_mut(parent) {
                    list.retain(|&p| p != pos);
                    if list.is_empty() {
                        self.children.remove(parent);
                    }
                }
            }
            None => self.roots.clear(pos),
        }
    }

    /// Assemble a cache from decoded parts without recomputing indexes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        snapshot: DirSnapshot,
        entries: Vec<CacheEntry>,
        status_bm: Vec<Bitmap>,
        priority_bm: Vec<Bitmap>,
        type_bm: Vec<Bitmap>,
        children: BTreeMap<String, Vec<usize>>,
        roots: Bitmap,
        invalid: Vec<InvalidFile>,
    ) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.filename().to_string(), pos))
            .collect();
        TicketCache {
            snapshot,
            stamp_ns: 0,
            entries,
            positions,
            status_bm,
            priority_bm,
            type_bm,
            children,
            roots,
            invalid,
        }
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: DirSnapshot) {
        self.snapshot = snapshot;
    }

    pub(crate) fn stamp_ns(&self) -> i64 {
        self.stamp_ns
    }

    pub(crate) fn set_stamp_ns(&mut self, stamp_ns: i64) {
        self.stamp_ns = stamp_ns;
    }

    pub(crate) fn take_contents(&mut self) -> (Vec<CacheEntry>, Vec<InvalidFile>) {
        self.positions.clear();
        (
            std::mem::take(&mut self.entries),
            std::mem::take(&mut self.invalid),
        )
    }

    /// Check every index against the entries.
    pub fn indexes_consistent(&self) -> bool {
        let mut fresh = TicketCache {
            entries: self.entries.clone(),
            ..Default::default()
        };
        fresh.rebuild_indexes();

        fresh.positions == self.positions
            && fresh.status_bm == self.status_bm
            && fresh.priority_bm == self.priority_bm
            && fresh.type_bm == self.type_bm
            && fresh.children == self.children
            && fresh.roots == self.roots
    }
}

fn intersect(acc: &mut Option<Bitmap>, bm: &Bitmap) {
    match acc {
        Some(a) => a.and_with(bm),
        None => *acc = Some(bm.clone()),
    }
}
