pub mod account_store;
pub mod block_store;
pub mod metadata_store;
pub mod orphan_store;

pub use account_store::DbAccountStore;
pub use block_store::DbBlockStore;
pub use metadata_store::MetadataStore;
pub use orphan_store::DbOrphanStore;

use crate::errors::{DbError, DbResult};

/// Decodes a big-endian u64 value
pub(crate) fn decode_u64(bytes: &[u8]) -> DbResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::InvalidData(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
