//! Binary cache file format.
//!
//! Little-endian throughout:
//!
//! ```text
//! magic "TIXC" | u32 format version
//! i64 dir mtime ns | u64 dir entry count
//! u32 N | N x { str filename | i64 file mtime ns | str summary JSON }
//! status, priority, type bitmaps: each u64 popcount + ceil(N/64) x u64
//! u32 K | K x { str parent id | u32 M | M x u32 position }
//! roots bitmap
//! u32 I | I x { str filename | i64 file mtime ns | str error }
//! u32 CRC-32C of everything above
//! ```
//!
//! `str` is a `u32` byte length followed by UTF-8 bytes.

use std::collections::BTreeMap;

use crate::cache_error::{CacheError, Result};
use crate::types::{Summary, TicketPriority, TicketStatus, TicketType};

use super::bitmap::{Bitmap, words_for};
use super::sync::DirSnapshot;
use super::{CacheEntry, Indexed, InvalidFile, TicketCache};

pub const MAGIC: [u8; 4] = *b"TIXC";

/// Bump whenever the layout or the Summary JSON shape changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 4;

pub fn encode(cache: &TicketCache) -> Result<Vec<u8>> {
    let mut w = Writer::default();
    w.bytes(&MAGIC);
    w.u32(CACHE_FORMAT_VERSION);

    let snapshot = cache.snapshot();
    w.i64(snapshot.mtime_ns);
    w.u64(snapshot.entries);

    w.len(cache.len())?;
    for entry in cache.entries() {
        w.str(entry.filename())?;
        w.i64(entry.mtime_ns);
        w.str(&serde_json::to_string(&entry.summary)?)?;
    }

    for &status in <TicketStatus as Indexed>::ALL {
        w.bitmap(cache.status_bitmap(status));
    }
    for &priority in <TicketPriority as Indexed>::ALL {
        w.bitmap(cache.priority_bitmap(priority));
    }
    for &ticket_type in <TicketType as Indexed>::ALL {
        w.bitmap(cache.type_bitmap(ticket_type));
    }

    w.len(cache.children().len())?;
    for (parent, positions) in cache.children() {
        w.str(parent)?;
        w.len(positions.len())?;
        for &pos in positions {
            w.len(pos)?;
        }
    }

    w.bitmap(cache.roots());

    w.len(cache.invalid().len())?;
    for file in cache.invalid() {
        w.str(&file.filename)?;
        w.i64(file.mtime_ns);
        w.str(&file.error)?;
    }

    let crc = crc32c::crc32c(&w.buf);
    w.u32(crc);
    Ok(w.buf)
}

pub fn decode(bytes: &[u8]) -> Result<TicketCache> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheError::Truncated("header"));
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if magic != MAGIC {
        return Err(CacheError::BadMagic(magic));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(version);
    if version != CACHE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            expected: CACHE_FORMAT_VERSION,
            found: version,
        });
    }

    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(CacheError::Truncated("checksum"));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let mut stored = [0u8; 4];
    stored.copy_from_slice(trailer);
    let stored = u32::from_le_bytes(stored);
    let computed = crc32c::crc32c(body);
    if stored != computed {
        return Err(CacheError::ChecksumMismatch { stored, computed });
    }

    let mut r = Reader {
        buf: body,
        pos: HEADER_LEN,
    };

    let snapshot = DirSnapshot {
        mtime_ns: r.i64("snapshot")?,
        entries: r.u64("snapshot")?,
    };

    let n = r.u32("summary count")? as usize;
    let mut entries: Vec<CacheEntry> = Vec::with_capacity(n.min(body.len()));
    for _ in 0..n {
        let filename = r.str("summary filename")?;
        let mtime_ns = r.i64("summary mtime")?;
        let summary: Summary = serde_json::from_str(&r.str("summary")?)?;
        if summary.filename != filename {
            return Err(CacheError::Corrupted(format!(
                "summary for {filename} names {}",
                summary.filename
            )));
        }
        if let Some(prev) = entries.last()
            && prev.filename() >= filename.as_str()
        {
            return Err(CacheError::Corrupted(format!(
                "summaries out of order at {filename}"
            )));
        }
        entries.push(CacheEntry { mtime_ns, summary });
    }

    let status_bm = r.bitmaps(<TicketStatus as Indexed>::ALL.len(), n, "status bitmap")?;
    let priority_bm = r.bitmaps(<TicketPriority as Indexed>::ALL.len(), n, "priority bitmap")?;
    let type_bm = r.bitmaps(<TicketType as Indexed>::ALL.len(), n, "type bitmap")?;

    let k = r.u32("children count")? as usize;
    let mut children = BTreeMap::new();
    for _ in 0..k {
        let parent = r.str("parent id")?;
        let m = r.u32("child count")? as usize;
        let mut positions = Vec::with_capacity(m.min(n));
        for _ in 0..m {
            let pos = r.u32("child position")? as usize;
            if pos >= n {
                return Err(CacheError::Corrupted(format!(
                    "child position {pos} out of range for {n} summaries"
                )));
            }
            positions.push(pos);
        }
        children.insert(parent, positions);
    }

    let roots = r.bitmap(n, "roots bitmap")?;

    let i = r.u32("invalid count")? as usize;
    let mut invalid = Vec::with_capacity(i.min(body.len()));
    for _ in 0..i {
        invalid.push(InvalidFile {
            filename: r.str("invalid filename")?,
            mtime_ns: r.i64("invalid mtime")?,
            error: r.str("invalid error")?,
        });
    }

    if r.pos != body.len() {
        return Err(CacheError::Corrupted(format!(
            "{} trailing bytes",
            body.len() - r.pos
        )));
    }

    Ok(TicketCache::from_parts(
        snapshot, entries, status_bm, priority_bm, type_bm, children, roots, invalid,
    ))
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.bytes(&v.to_le_bytes());
    }

    fn len(&mut self, n: usize) -> Result<()> {
        let n = u32::try_from(n)
            .map_err(|_| CacheError::Corrupted(format!("length {n} exceeds u32")))?;
        self.u32(n);
        Ok(())
    }

    fn str(&mut self, s: &str) -> Result<()> {
        self.len(s.len())?;
        self.bytes(s.as_bytes());
        Ok(())
    }

    fn bitmap(&mut self, bm: &Bitmap) {
        self.u64(bm.count_ones());
        for &word in bm.words() {
            self.u64(word);
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(CacheError::Truncated(what))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }

    fn i64(&mut self, what: &'static str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array(what)?))
    }

    fn str(&mut self, what: &'static str) -> Result<String> {
        let len = self.u32(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CacheError::Corrupted(format!("invalid UTF-8 in {what}")))
    }

    fn bitmap(&mut self, len: usize, what: &'static str) -> Result<Bitmap> {
        let popcount = self.u64(what)?;
        let n_words = words_for(len);
        let mut words = Vec::with_capacity(n_words.min(self.buf.len() / 8));
        for _ in 0..n_words {
            words.push(self.u64(what)?);
        }
        let bm = Bitmap::from_words(words, len)
            .ok_or_else(|| CacheError::Corrupted(format!("bad word count in {what}")))?;
        if bm.count_ones() != popcount {
            return Err(CacheError::Corrupted(format!(
                "popcount mismatch in {what}: stored {popcount}, found {}",
                bm.count_ones()
            )));
        }
        Ok(bm)
    }

    fn bitmaps(&mut self, count: usize, len: usize, what: &'static str) -> Result<Vec<Bitmap>> {
        (0..count).map(|_| self.bitmap(len, what)).collect()
    }
}
