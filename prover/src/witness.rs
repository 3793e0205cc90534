//! The private inputs of a block proof.

use block_codec::{
    build_stored_block_header, encode_commit_block, BlockRecord, CommitBlockInfo, EncodingError,
    StoredBlockHeader,
};
use rollup_common::Hash32;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("block {height} does not follow block {previous}")]
    NotSuccessor { previous: u32, height: u32 },
}

/// Everything the circuit needs to attest the transition from `previous` to
/// `header`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockWitness {
    pub previous: StoredBlockHeader,
    pub header: StoredBlockHeader,
    pub commit: CommitBlockInfo,
}

impl BlockWitness {
    /// Builds the witness for `block` on top of `previous`, which is either
    /// the predecessor's header or the genesis header.
    pub fn build(previous: StoredBlockHeader, block: &BlockRecord) -> Result<Self, WitnessError> {
        let header = build_stored_block_header(block)?;
        let commit = encode_commit_block(block)?;

        if previous.block_number.checked_add(1) != Some(header.block_number) {
            return Err(WitnessError::NotSuccessor {
                previous: previous.block_number,
                height: header.block_number,
            });
        }

        Ok(Self {
            previous,
            header,
            commit,
        })
    }

    pub fn block_number(&self) -> u32 {
        self.header.block_number
    }

    /// Keccak of the committed public data, as bound by the circuit.
    pub fn public_data_hash(&self) -> Hash32 {
        rollup_common::keccak256(&self.commit.public_data)
    }
}

/// Splits a 32-byte value into big-endian `u32` limbs.
pub(crate) fn hash_limbs(hash: &Hash32) -> [u32; 8] {
    let mut limbs = [0u32; 8];
    for (limb, chunk) in limbs.iter_mut().zip(hash.chunks_exact(4)) {
        *limb = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    limbs
}

/// Splits a 64-bit value into `[low, high]` `u32` limbs.
pub(crate) fn u64_limbs(value: u64) -> [u32; 2] {
    [value as u32, (value >> 32) as u32]
}
