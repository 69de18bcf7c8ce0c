use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash as StdHash, Hasher};
use std::ops::Deref;

pub const HASH_SIZE: usize = 32;

/// Number of leading bytes cleared in a hashlow.
pub const HASH_LOW_PREFIX: usize = 8;

/// Length of the fragment a link field carries for a block target.
pub const HASH_LOW_FRAGMENT: usize = HASH_SIZE - HASH_LOW_PREFIX;

pub const ZERO_HASH: Hash = Hash([0u8; HASH_SIZE]);

/// A 32-byte hash wrapper used across the project.
///
/// Block identities are always in hashlow form: the first eight bytes are zero,
/// so the identity fits into the 24-byte fragment of a link field.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a hash from a 32-byte array
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Creates a zeroed hash
    pub fn zeroed() -> Self {
        ZERO_HASH
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }

    /// Constructs a hash from four little-endian u64s (used in tests)
    pub const fn from_le_u64(parts: [u64; 4]) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        let mut i = 0;
        while i < 4 {
            let le = parts[i].to_le_bytes();
            let mut j = 0;
            while j < 8 {
                bytes[i * 8 + j] = le[j];
                j += 1;
            }
            i += 1;
        }
        Self(bytes)
    }

    /// Tries to create a Hash from a slice of bytes
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, std::array::TryFromSliceError> {
        let array: [u8; HASH_SIZE] = slice.try_into()?;
        Ok(Self(array))
    }

    /// Double SHA-256 of `data`.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        Self(second.into())
    }

    /// The hashlow form: this hash with its first eight bytes cleared.
    pub fn hash_low(&self) -> Self {
        let mut bytes = self.0;
        bytes[..HASH_LOW_PREFIX].fill(0);
        Self(bytes)
    }

    /// Bytes 8..32, the part of a hashlow carried inside a link field.
    pub fn low_fragment(&self) -> [u8; HASH_LOW_FRAGMENT] {
        let mut out = [0u8; HASH_LOW_FRAGMENT];
        out.copy_from_slice(&self.0[HASH_LOW_PREFIX..]);
        out
    }

    /// Rebuilds a hashlow from a link-field fragment.
    pub fn from_low_fragment(fragment: &[u8]) -> Option<Self> {
        if fragment.len() != HASH_LOW_FRAGMENT {
            return None;
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes[HASH_LOW_PREFIX..].copy_from_slice(fragment);
        Some(Self(bytes))
    }

    /// Little-endian word at bytes 8..16, the value summed by time digests.
    pub fn digest_word(&self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[HASH_LOW_PREFIX..HASH_LOW_PREFIX + 8]);
        u64::from_le_bytes(word)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; HASH_SIZE] {
    fn from(h: Hash) -> Self {
        h.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from_slice(slice)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl StdHash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // the low fragment is uniformly distributed; the last word is enough
        let mut le = [0u8; 8];
        le.copy_from_slice(&self.0[24..32]);
        u64::from_le_bytes(le).hash(state);
    }
}

impl Deref for Hash {
    type Target = [u8; HASH_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_low_clears_prefix() {
        let h = Hash::from_le_u64([u64::MAX, 1, 2, 3]);
        let low = h.hash_low();
        assert_eq!(&low.as_bytes()[..8], &[0u8; 8]);
        assert_eq!(&low.as_bytes()[8..], &h.as_bytes()[8..]);
    }

    #[test]
    fn fragment_restores_hash_low() {
        let h = Hash::double_sha256(b"block").hash_low();
        let restored = Hash::from_low_fragment(&h.low_fragment()).unwrap();
        assert_eq!(restored, h);
        assert!(Hash::from_low_fragment(&[0u8; 10]).is_none());
    }

    #[test]
    fn digest_word_reads_second_word() {
        let h = Hash::from_le_u64([7, 42, 0, 0]);
        assert_eq!(h.digest_word(), 42);
    }
}
