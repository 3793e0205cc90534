use std::fmt;

use alloy::primitives::U256;
use rollup_common::Hash32;
use serde::{Deserialize, Serialize};

/// Lifecycle of a rollup block in the store.
///
/// Blocks only ever move forward through these states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    /// Produced by the sequencer, not yet committed on chain.
    Pending,
    /// Committed on chain, awaiting a proof.
    Committed,
    /// A verified proof is stored for this block.
    Proved,
    /// Proof accepted on chain.
    Verified,
}

impl BlockStatus {
    /// Whether the block is the prover's to pick up: committed on chain,
    /// not proved yet. Pending blocks wait for their commit first.
    pub const fn is_awaiting_proof(self) -> bool {
        matches!(self, BlockStatus::Committed)
    }

    /// Whether a proof has already been produced for the block.
    pub const fn is_proved(self) -> bool {
        matches!(self, BlockStatus::Proved | BlockStatus::Verified)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockStatus::Pending => "pending",
            BlockStatus::Committed => "committed",
            BlockStatus::Proved => "proved",
            BlockStatus::Verified => "verified",
        };
        f.write_str(s)
    }
}

/// A rollup block as persisted by the sequencer.
///
/// Hash and payload fields are kept as the hex / json text the sequencer
/// wrote; decoding happens when the record is encoded for the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub height: u64,
    /// Hex, 32 bytes once decoded.
    pub state_root: String,
    /// Hex, 32 bytes once decoded.
    pub commitment: String,
    /// Hex, 32 bytes once decoded.
    pub pending_onchain_ops_hash: String,
    /// Hex, arbitrary length. Empty text means no public data.
    pub public_data: String,
    /// JSON array of non-negative integers.
    pub public_data_offsets: String,
    /// JSON array of byte strings, each either hex text or an array of bytes.
    pub pending_onchain_ops_pubdata: String,
    pub priority_operations: u64,
    /// Creation time in milliseconds since the unix epoch.
    pub created_at: u64,
    pub status: BlockStatus,
}

/// The compact per-block summary the rollup contract stores and hashes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlockHeader {
    pub block_number: u32,
    pub priority_operations: u64,
    #[serde(with = "rollup_common::hex_0x")]
    pub pending_onchain_operations_hash: Hash32,
    #[serde(with = "crate::u256_dec")]
    pub timestamp: U256,
    #[serde(with = "rollup_common::hex_0x")]
    pub state_root: Hash32,
    #[serde(with = "rollup_common::hex_0x")]
    pub commitment: Hash32,
}

/// Data submitted when committing a new block on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitBlockInfo {
    #[serde(with = "rollup_common::hex_0x")]
    pub new_state_root: Hash32,
    #[serde(with = "rollup_common::hex_0x")]
    pub public_data: Vec<u8>,
    #[serde(with = "crate::u256_dec")]
    pub timestamp: U256,
    pub public_data_offsets: Vec<u32>,
    pub block_number: u32,
}

/// Data submitted when verifying and executing a proved block on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBlockInfo {
    #[serde(rename = "blockHeader")]
    pub header: StoredBlockHeader,
    #[serde(with = "rollup_common::hex_0x::vec")]
    pub pending_onchain_ops_pubdata: Vec<Vec<u8>>,
}
