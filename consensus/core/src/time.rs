//! Block time and the per-range digests exchanged during sync
//!
//! Block time counts 1/1024 s units since the Unix epoch. Blocks are grouped
//! into 64 s epochs.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time units per second
pub const UNITS_PER_SECOND: u64 = 1024;

/// log2 of the epoch length in time units
pub const EPOCH_BITS: u32 = 16;

/// Number of buckets in a time digest
pub const DIGEST_BUCKETS: usize = 16;

/// Serialized size of a time digest: sum and count per bucket
pub const DIGEST_BYTES: usize = DIGEST_BUCKETS * 16;

pub fn from_millis(ms: u64) -> u64 {
    ms.saturating_mul(UNITS_PER_SECOND) / 1000
}

pub fn to_millis(t: u64) -> u64 {
    t.saturating_mul(1000) / UNITS_PER_SECOND
}

/// Current time in block time units
pub fn now() -> u64 {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    from_millis(ms)
}

pub fn epoch_of(t: u64) -> u64 {
    t >> EPOCH_BITS
}

pub fn start_of_epoch(t: u64) -> u64 {
    t & !((1u64 << EPOCH_BITS) - 1)
}

pub fn end_of_epoch(t: u64) -> u64 {
    t | ((1u64 << EPOCH_BITS) - 1)
}

/// One bucket of a [`TimeDigest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestBucket {
    pub sum: u64,
    pub count: u64,
}

/// Summary of the blocks whose timestamps fall into `[t, t + dt)`, split into
/// sixteen equal sub-ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDigest {
    pub buckets: [DigestBucket; DIGEST_BUCKETS],
}

impl TimeDigest {
    /// Folds a block into the bucket covering `timestamp`. Blocks outside
    /// `[from, from + dt)` are ignored.
    pub fn add(&mut self, from: u64, dt: u64, timestamp: u64, hash: &Hash) {
        if timestamp < from || timestamp - from >= dt {
            return;
        }
        let width = (dt / DIGEST_BUCKETS as u64).max(1);
        let index = (((timestamp - from) / width) as usize).min(DIGEST_BUCKETS - 1);
        let bucket = &mut self.buckets[index];
        bucket.sum = bucket.sum.wrapping_add(hash.digest_word());
        bucket.count += 1;
    }

    pub fn block_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    /// Indices of buckets whose sum or count differ.
    pub fn differing_buckets(&self, other: &TimeDigest) -> Vec<usize> {
        self.buckets
            .iter()
            .zip(other.buckets.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect()
    }

    /// Wire form: per bucket, sum then count, both little endian.
    pub fn to_bytes(&self) -> [u8; DIGEST_BYTES] {
        let mut out = [0u8; DIGEST_BYTES];
        for (i, bucket) in self.buckets.iter().enumerate() {
            out[i * 16..i * 16 + 8].copy_from_slice(&bucket.sum.to_le_bytes());
            out[i * 16 + 8..i * 16 + 16].copy_from_slice(&bucket.count.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != DIGEST_BYTES {
            return None;
        }
        let mut digest = TimeDigest::default();
        for (i, chunk) in bytes.chunks_exact(16).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&chunk[..8]);
            digest.buckets[i].sum = u64::from_le_bytes(word);
            word.copy_from_slice(&chunk[8..]);
            digest.buckets[i].count = u64::from_le_bytes(word);
        }
        Some(digest)
    }
}
