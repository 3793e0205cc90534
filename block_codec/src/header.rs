//! The [`StoredBlockHeader`] builder, plus the field decoders shared by the
//! commit and verify encoders.

use alloy::primitives::U256;
use rollup_common::{Hash32, HASH_LEN};
use serde::de::DeserializeOwned;

use crate::{BlockRecord, EncodingError, StoredBlockHeader};

/// Builds the header the rollup contract stores for `block`.
///
/// Hash fields must decode to exactly 32 bytes; nothing is padded or
/// truncated. The genesis header is never built here, see
/// [`genesis_block_header`](crate::genesis_block_header).
pub fn build_stored_block_header(block: &BlockRecord) -> Result<StoredBlockHeader, EncodingError> {
    Ok(StoredBlockHeader {
        block_number: block_number(block.height)?,
        priority_operations: block.priority_operations,
        pending_onchain_operations_hash: decode_hash(
            block.height,
            "pending_onchain_ops_hash",
            &block.pending_onchain_ops_hash,
        )?,
        timestamp: timestamp(block),
        state_root: decode_hash(block.height, "state_root", &block.state_root)?,
        commitment: decode_hash(block.height, "commitment", &block.commitment)?,
    })
}

pub(crate) fn block_number(height: u64) -> Result<u32, EncodingError> {
    u32::try_from(height).map_err(|_| EncodingError::HeightOverflow { height })
}

pub(crate) fn timestamp(block: &BlockRecord) -> U256 {
    U256::from(block.created_at)
}

pub(crate) fn decode_bytes(
    height: u64,
    field: &'static str,
    text: &str,
) -> Result<Vec<u8>, EncodingError> {
    rollup_common::decode_hex(text).map_err(|source| EncodingError::InvalidHex {
        height,
        field,
        source,
    })
}

pub(crate) fn decode_hash(
    height: u64,
    field: &'static str,
    text: &str,
) -> Result<Hash32, EncodingError> {
    let bytes = decode_bytes(height, field, text)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| EncodingError::InvalidHexLength {
            height,
            field,
            expected: HASH_LEN,
            actual,
        })
}

pub(crate) fn decode_json<T: DeserializeOwned>(
    height: u64,
    field: &'static str,
    text: &str,
) -> Result<T, EncodingError> {
    serde_json::from_str(text).map_err(|source| EncodingError::MalformedJson {
        height,
        field,
        source,
    })
}
