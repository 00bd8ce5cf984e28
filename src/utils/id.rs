//! Ticket id allocation.
//!
//! Ids are `<timestamp><suffix>`: the creation time in whole seconds since
//! the Unix epoch in base 36, left-padded to [`TIMESTAMP_LEN`] characters,
//! followed by [`SUFFIX_LEN`] random base-36 characters. The alphabet sorts
//! in ASCII order the same way it sorts numerically, so ids created in
//! different seconds sort in creation order.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::error::{Result, TixError};
use crate::types::ticket_filename;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Width of the timestamp component; 36^7 seconds reaches past year 4400.
pub const TIMESTAMP_LEN: usize = 7;

/// Width of the random suffix.
pub const SUFFIX_LEN: usize = 3;

/// How many candidates to try before giving up.
pub const ID_ALLOCATION_ATTEMPTS: u32 = 64;

/// Render `seconds` in base 36, left-padded with `0` to [`TIMESTAMP_LEN`].
pub fn encode_timestamp(mut seconds: u64) -> String {
    let mut digits = Vec::with_capacity(TIMESTAMP_LEN);
    while seconds > 0 {
        digits.push(ALPHABET[(seconds % 36) as usize]);
        seconds /= 36;
    }
    while digits.len() < TIMESTAMP_LEN {
        digits.push(b'0');
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

pub fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Build one candidate id for the given creation second.
pub fn candidate_at<R: Rng>(seconds: u64, rng: &mut R) -> String {
    let mut id = encode_timestamp(seconds);
    id.push_str(&random_suffix(rng));
    id
}

pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Allocate an id whose file does not yet exist in `dir`, then hand it to
/// `claim`.
///
/// `claim` performs the exclusive create. If it returns
/// [`ClaimError::Taken`] (another process took the same candidate between
/// the existence check and the create), the suffix is re-rolled. Each
/// candidate consumes one attempt.
pub fn allocate<T, F>(dir: &Path, mut claim: F) -> Result<T>
where
    F: FnMut(&str) -> std::result::Result<T, ClaimError>,
{
    let mut rng = rand::rng();

    for _ in 0..ID_ALLOCATION_ATTEMPTS {
        let candidate = candidate_at(now_seconds(), &mut rng);
        if dir.join(ticket_filename(&candidate)).exists() {
            tracing::debug!(%candidate, "id candidate taken, re-rolling");
            continue;
        }

        match claim(&candidate) {
            Ok(value) => return Ok(value),
            Err(ClaimError::Taken) => {
                tracing::debug!(%candidate, "id candidate claimed concurrently, re-rolling");
            }
            Err(ClaimError::Failed(e)) => return Err(e),
        }
    }

    Err(TixError::IdAllocationExhausted(ID_ALLOCATION_ATTEMPTS))
}

/// Outcome of a failed claim in [`allocate`].
#[derive(Debug)]
pub enum ClaimError {
    /// The candidate was created by someone else; try another.
    Taken,
    Failed(TixError),
}

impl From<TixError> for ClaimError {
    fn from(e: TixError) -> Self {
        ClaimError::Failed(e)
    }
}
