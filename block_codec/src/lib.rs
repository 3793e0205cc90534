//! Conversion of persisted rollup block records into the fixed-layout
//! structures consumed by the on-chain rollup contract.
//!
//! - [`header`] builds the [`StoredBlockHeader`] the contract keeps per block.
//! - [`commit`] turns not-yet-committed blocks into [`CommitBlockInfo`]s.
//! - [`verify`] turns proved blocks into [`VerifyBlockInfo`]s paired with
//!   their proofs.
//! - [`genesis`] serves the constant header preceding block 1.
//! - [`abi`] produces the exact Solidity ABI encodings of the above.
//!
//! Every function here is pure: records go in, typed values or an
//! [`EncodingError`] come out.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod abi;
pub mod commit;
mod error;
pub mod genesis;
pub mod header;
mod types;
pub mod verify;

pub use commit::{encode_commit_block, encode_commit_blocks};
pub use error::EncodingError;
pub use genesis::genesis_block_header;
pub use header::build_stored_block_header;
pub use types::{BlockRecord, BlockStatus, CommitBlockInfo, StoredBlockHeader, VerifyBlockInfo};
pub use verify::encode_verify_blocks;

/// Checks that `blocks` carry `expected_status` and that their heights run
/// without gaps, starting from `first_height` when one is given.
pub(crate) fn check_batch(
    blocks: &[BlockRecord],
    first_height: Option<u64>,
    expected_status: BlockStatus,
) -> Result<(), EncodingError> {
    let mut expected = first_height;
    for block in blocks {
        if let Some(expected) = expected {
            if block.height != expected {
                return Err(EncodingError::NonContiguousHeight {
                    expected,
                    found: block.height,
                });
            }
        }
        if block.status != expected_status {
            return Err(EncodingError::UnexpectedStatus {
                height: block.height,
                expected: expected_status,
                found: block.status,
            });
        }
        expected = Some(
            block
                .height
                .checked_add(1)
                .ok_or(EncodingError::HeightOverflow {
                    height: block.height,
                })?,
        );
    }
    Ok(())
}

/// Decimal string (de)serialization for 256-bit integers.
pub(crate) mod u256_dec {
    use alloy::primitives::U256;
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<U256>().map_err(D::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod testing_utils {
    use crate::{BlockRecord, BlockStatus};

    pub(crate) const STATE_ROOT: &str =
        "0x1111111111111111111111111111111111111111111111111111111111111111";
    pub(crate) const COMMITMENT: &str =
        "2222222222222222222222222222222222222222222222222222222222222222";
    pub(crate) const OPS_HASH: &str =
        "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

    pub(crate) fn block(height: u64, status: BlockStatus) -> BlockRecord {
        BlockRecord {
            height,
            state_root: STATE_ROOT.to_string(),
            commitment: COMMITMENT.to_string(),
            pending_onchain_ops_hash: OPS_HASH.to_string(),
            public_data: format!("0x{}", "ab".repeat(64)),
            public_data_offsets: "[0,32,64]".to_string(),
            pending_onchain_ops_pubdata: "[]".to_string(),
            priority_operations: 0,
            created_at: 1_650_000_000_000 + height,
            status,
        }
    }
}
