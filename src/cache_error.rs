use thiserror::Error;

/// Integrity failures of the on-disk cache image. Any of these makes the
/// coherency layer discard the file and rebuild from the ticket directory.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("bad cache magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("cache format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("cache file truncated while reading {0}")]
    Truncated(&'static str),

    #[error("cache checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("cache file corrupted: {0}")]
    Corrupted(String),

    #[error("serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
