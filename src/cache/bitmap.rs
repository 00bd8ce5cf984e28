//! Fixed-length bitsets over cache positions.

/// A bitset of `len` bits packed into little-endian `u64` words.
///
/// Bits past `len` in the last word are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
}

pub fn words_for(len: usize) -> usize {
    len.div_ceil(64)
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        Bitmap {
            words: vec![0; words_for(len)],
            len,
        }
    }

    /// Rebuild from raw words; stray bits past `len` are dropped.
    pub fn from_words(words: Vec<u64>, len: usize) -> Option<Self> {
        if words.len() != words_for(len) {
            return None;
        }
        let mut bm = Bitmap { words, len };
        bm.clear_tail();
        Some(bm)
    }

    fn clear_tail(&mut self) {
        let rem = self.len % 64;
        if rem != 0
            && let Some(last) = self.words.last_mut()
        {
            *last &= (1u64 << rem) - 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn set(&mut self, pos: usize) {
        debug_assert!(pos < self.len);
        self.words[pos / 64] |= 1u64 << (pos % 64);
    }

    pub fn clear(&mut self, pos: usize) {
        debug_assert!(pos < self.len);
        self.words[pos / 64] &= !(1u64 << (pos % 64));
    }

    pub fn test(&self, pos: usize) -> bool {
        pos < self.len && self.words[pos / 64] & (1u64 << (pos % 64)) != 0
    }

    /// Grow (or shrink) to `len` bits; new bits are zero.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(words_for(len), 0);
        self.len = len;
        self.clear_tail();
    }

    /// Word-wise intersection in place.
    pub fn and_with(&mut self, other: &Bitmap) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    /// Positions of set bits in ascending order.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

/// Iterator over set bits using trailing-zero scans.
pub struct Ones<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.index * 64 + bit);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}
