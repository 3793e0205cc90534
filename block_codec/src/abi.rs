//! Solidity ABI encodings of the on-chain payloads.
//!
//! The tuple layouts mirror the rollup contract:
//!
//! ```solidity
//! struct StoredBlockInfo {
//!     uint32 blockNumber;
//!     uint64 priorityOperations;
//!     bytes32 pendingOnchainOperationsHash;
//!     uint256 timestamp;
//!     bytes32 stateRoot;
//!     bytes32 commitment;
//! }
//! ```
//!
//! The contract stores `keccak256(abi.encode(StoredBlockInfo))` per block,
//! which is what [`StoredBlockHeader::hash`] reproduces.

use alloy::primitives::{Bytes, FixedBytes};
use alloy_sol_types::{SolCall as _, SolValue as _};
use rollup_common::Hash32;

use crate::{CommitBlockInfo, StoredBlockHeader, VerifyBlockInfo};

/// Generated bindings. Field names follow the contract.
pub mod sol {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct StoredBlockInfo {
            uint32 blockNumber;
            uint64 priorityOperations;
            bytes32 pendingOnchainOperationsHash;
            uint256 timestamp;
            bytes32 stateRoot;
            bytes32 commitment;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct CommitBlockInfo {
            bytes32 newStateRoot;
            bytes publicData;
            uint256 timestamp;
            uint32[] publicDataOffsets;
            uint32 blockNumber;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct VerifyAndExecuteBlockInfo {
            StoredBlockInfo blockHeader;
            bytes[] pendingOnchainOpsPubData;
        }

        function commitBlocks(
            StoredBlockInfo _lastCommittedBlockData,
            CommitBlockInfo[] _newBlocksData
        ) external;

        function verifyAndExecuteBlocks(
            VerifyAndExecuteBlockInfo[] _blocks,
            bytes[] _proofs
        ) external;
    }
}

impl From<&StoredBlockHeader> for sol::StoredBlockInfo {
    fn from(header: &StoredBlockHeader) -> Self {
        Self {
            blockNumber: header.block_number,
            priorityOperations: header.priority_operations,
            pendingOnchainOperationsHash: FixedBytes(header.pending_onchain_operations_hash),
            timestamp: header.timestamp,
            stateRoot: FixedBytes(header.state_root),
            commitment: FixedBytes(header.commitment),
        }
    }
}

impl From<&CommitBlockInfo> for sol::CommitBlockInfo {
    fn from(info: &CommitBlockInfo) -> Self {
        Self {
            newStateRoot: FixedBytes(info.new_state_root),
            publicData: Bytes::copy_from_slice(&info.public_data),
            timestamp: info.timestamp,
            publicDataOffsets: info.public_data_offsets.clone(),
            blockNumber: info.block_number,
        }
    }
}

impl From<&VerifyBlockInfo> for sol::VerifyAndExecuteBlockInfo {
    fn from(info: &VerifyBlockInfo) -> Self {
        Self {
            blockHeader: (&info.header).into(),
            pendingOnchainOpsPubData: info
                .pending_onchain_ops_pubdata
                .iter()
                .map(|data| Bytes::copy_from_slice(data))
                .collect(),
        }
    }
}

impl StoredBlockHeader {
    /// `abi.encode(StoredBlockInfo)`: six static words.
    pub fn abi_encode(&self) -> Vec<u8> {
        sol::StoredBlockInfo::from(self).abi_encode()
    }

    /// The hash the contract records for this block.
    pub fn hash(&self) -> Hash32 {
        rollup_common::keccak256(self.abi_encode())
    }
}

/// Calldata for `commitBlocks(lastCommitted, newBlocks)`.
pub fn commit_blocks_calldata(
    last_committed: &StoredBlockHeader,
    blocks: &[CommitBlockInfo],
) -> Vec<u8> {
    sol::commitBlocksCall {
        _lastCommittedBlockData: last_committed.into(),
        _newBlocksData: blocks.iter().map(Into::into).collect(),
    }
    .abi_encode()
}

/// Calldata for `verifyAndExecuteBlocks(blocks, proofs)`.
///
/// Proofs travel as opaque byte strings, in the same order as the blocks.
pub fn verify_blocks_calldata<P: AsRef<[u8]>>(blocks: &[(VerifyBlockInfo, P)]) -> Vec<u8> {
    let (infos, proofs): (Vec<sol::VerifyAndExecuteBlockInfo>, Vec<Bytes>) = blocks
        .iter()
        .map(|(info, proof)| (info.into(), Bytes::copy_from_slice(proof.as_ref())))
        .unzip();
    sol::verifyAndExecuteBlocksCall {
        _blocks: infos,
        _proofs: proofs,
    }
    .abi_encode()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use alloy_sol_types::SolCall;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::genesis_block_header;

    fn word(tail: &[u8]) -> Vec<u8> {
        let mut word = vec![0u8; 32 - tail.len()];
        word.extend_from_slice(tail);
        word
    }

    #[test]
    fn stored_header_layout() {
        let header = StoredBlockHeader {
            block_number: 0x0102_0304,
            priority_operations: 5,
            pending_onchain_operations_hash: [0xaa; 32],
            timestamp: U256::from(0x0180_0000_0000u64),
            state_root: [0xbb; 32],
            commitment: [0xcc; 32],
        };

        let expected = [
            word(&[1, 2, 3, 4]),
            word(&[5]),
            vec![0xaa; 32],
            word(&[0x01, 0x80, 0, 0, 0, 0]),
            vec![0xbb; 32],
            vec![0xcc; 32],
        ]
        .concat();

        assert_eq!(header.abi_encode(), expected);
        assert_eq!(header.hash(), rollup_common::keccak256(&expected));
    }

    #[test]
    fn genesis_hash_covers_its_encoding() {
        let genesis = genesis_block_header();
        let encoded = genesis.abi_encode();
        assert_eq!(encoded.len(), 6 * 32);
        assert_eq!(&encoded[..64], &[0u8; 64][..]);
        assert_eq!(&encoded[64..96], &rollup_common::EMPTY_STRING_KECCAK[..]);
        assert_eq!(&encoded[128..160], &rollup_common::NIL_STATE_ROOT[..]);
        assert_ne!(genesis.hash(), rollup_common::ZERO_HASH);
    }

    #[test]
    fn commit_calldata_round_trips_through_bindings() {
        let last = genesis_block_header();
        let info = CommitBlockInfo {
            new_state_root: [0x11; 32],
            public_data: vec![0x5a; 64],
            timestamp: U256::from(42u64),
            public_data_offsets: vec![0, 32, 64],
            block_number: 1,
        };
        let calldata = commit_blocks_calldata(&last, &[info.clone()]);

        assert_eq!(&calldata[..4], &<sol::commitBlocksCall as SolCall>::SELECTOR[..]);
        let decoded = <sol::commitBlocksCall as SolCall>::abi_decode(&calldata, true).unwrap();
        assert_eq!(
            decoded._lastCommittedBlockData,
            sol::StoredBlockInfo::from(&last)
        );
        assert_eq!(decoded._newBlocksData, vec![sol::CommitBlockInfo::from(&info)]);
    }

    #[test]
    fn verify_calldata_keeps_proof_order() {
        let info = VerifyBlockInfo {
            header: genesis_block_header(),
            pending_onchain_ops_pubdata: vec![vec![1, 2, 3]],
        };
        let blocks = vec![(info.clone(), vec![0xde, 0xad]), (info, vec![0xbe, 0xef])];
        let calldata = verify_blocks_calldata(&blocks);

        let decoded =
            <sol::verifyAndExecuteBlocksCall as SolCall>::abi_decode(&calldata, true).unwrap();
        assert_eq!(decoded._blocks.len(), 2);
        assert_eq!(
            decoded._proofs,
            vec![Bytes::from(vec![0xde, 0xad]), Bytes::from(vec![0xbe, 0xef])]
        );
        assert_eq!(
            decoded._blocks[0].pendingOnchainOpsPubData,
            vec![Bytes::from(vec![1, 2, 3])]
        );
    }
}
