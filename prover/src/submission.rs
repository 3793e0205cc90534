//! Builds the next commit and verify batches for on-chain submission, and
//! records their outcome.

use std::collections::BTreeMap;

use block_codec::abi::{commit_blocks_calldata, verify_blocks_calldata};
use block_codec::{
    build_stored_block_header, encode_commit_blocks, encode_verify_blocks, genesis_block_header,
    BlockRecord, BlockStatus, CommitBlockInfo, EncodingError, StoredBlockHeader, VerifyBlockInfo,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::proof_types::ProofArtifact;
use crate::store::{BlockStore, StoreError};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("block {0}, the last committed one, is missing from the store")]
    MissingLastCommitted(u64),
}

/// Blocks ready for `commitBlocks`, on top of the last committed header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitBatch {
    pub last_committed: StoredBlockHeader,
    pub blocks: Vec<CommitBlockInfo>,
}

impl CommitBatch {
    pub fn heights(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().map(|b| u64::from(b.block_number))
    }

    pub fn calldata(&self) -> Vec<u8> {
        commit_blocks_calldata(&self.last_committed, &self.blocks)
    }
}

/// Proved blocks ready for `verifyAndExecuteBlocks`, each with its proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyBatch {
    pub blocks: Vec<(VerifyBlockInfo, ProofArtifact)>,
}

impl VerifyBatch {
    pub fn heights(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks
            .iter()
            .map(|(info, _)| u64::from(info.header.block_number))
    }

    pub fn calldata(&self) -> Vec<u8> {
        verify_blocks_calldata(&self.blocks)
    }
}

/// The leading run of consecutive heights in `blocks`, at most `max_blocks`
/// long.
fn contiguous_prefix(blocks: Vec<BlockRecord>, max_blocks: usize) -> Vec<BlockRecord> {
    let Some(first) = blocks.first().map(|b| b.height) else {
        return blocks;
    };
    blocks
        .into_iter()
        .zip(first..)
        .take_while(|(block, expected)| block.height == *expected)
        .map(|(block, _)| block)
        .take(max_blocks)
        .collect()
}

/// The lowest run of pending blocks, up to `max_blocks` of them, or `None`
/// when nothing is pending.
pub async fn next_commit_batch<S: BlockStore>(
    store: &S,
    max_blocks: usize,
) -> Result<Option<CommitBatch>, SubmissionError> {
    let pending = contiguous_prefix(store.list_blocks(BlockStatus::Pending, 0).await?, max_blocks);
    let Some(first) = pending.first().map(|b| b.height) else {
        debug!("no pending blocks to commit");
        return Ok(None);
    };

    let last_committed_height = first.checked_sub(1).ok_or(EncodingError::NonContiguousHeight {
        expected: 1,
        found: first,
    })?;
    let last_committed = match last_committed_height {
        0 => genesis_block_header(),
        height => {
            let block = store
                .get_block(height)
                .await?
                .ok_or(SubmissionError::MissingLastCommitted(height))?;
            build_stored_block_header(&block)?
        }
    };

    let blocks = encode_commit_blocks(last_committed_height, &pending)?;
    info!(
        from = first,
        count = blocks.len(),
        "built commit batch"
    );
    Ok(Some(CommitBatch {
        last_committed,
        blocks,
    }))
}

/// The lowest run of proved blocks, up to `max_blocks` of them, paired with
/// their proofs, or `None` when nothing is proved.
pub async fn next_verify_batch<S: BlockStore>(
    store: &S,
    max_blocks: usize,
) -> Result<Option<VerifyBatch>, SubmissionError> {
    let proved = contiguous_prefix(store.list_blocks(BlockStatus::Proved, 0).await?, max_blocks);
    if proved.is_empty() {
        debug!("no proved blocks to verify");
        return Ok(None);
    }

    let mut proofs = BTreeMap::new();
    for block in &proved {
        if let Some(proof) = store.get_proof(block.height).await? {
            proofs.insert(block.height, proof);
        }
    }

    let blocks = encode_verify_blocks(&proved, |height| proofs.remove(&height))?;
    info!(
        from = proved[0].height,
        count = blocks.len(),
        "built verify batch"
    );
    Ok(Some(VerifyBatch { blocks }))
}

/// Moves every block of a submitted commit batch to
/// [`BlockStatus::Committed`].
pub async fn mark_committed<S: BlockStore>(
    store: &S,
    batch: &CommitBatch,
) -> Result<(), SubmissionError> {
    for height in batch.heights() {
        store.update_status(height, BlockStatus::Committed).await?;
    }
    Ok(())
}

/// Moves every block of a submitted verify batch to
/// [`BlockStatus::Verified`].
pub async fn mark_verified<S: BlockStore>(
    store: &S,
    batch: &VerifyBatch,
) -> Result<(), SubmissionError> {
    for height in batch.heights() {
        store.update_status(height, BlockStatus::Verified).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::MemoryBlockStore;
    use crate::testing_utils::record;

    fn with_status(height: u64, status: BlockStatus) -> BlockRecord {
        BlockRecord {
            status,
            ..record(height)
        }
    }

    #[tokio::test]
    async fn commit_batch_starts_after_last_committed() {
        let store = MemoryBlockStore::new([
            with_status(4, BlockStatus::Committed),
            with_status(5, BlockStatus::Pending),
            with_status(6, BlockStatus::Pending),
            with_status(8, BlockStatus::Pending),
        ]);

        let batch = next_commit_batch(&store, 10).await.unwrap().unwrap();

        assert_eq!(batch.heights().collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(
            batch.last_committed,
            build_stored_block_header(&record(4)).unwrap()
        );
        assert_eq!(batch.blocks[0].new_state_root[31], 5);
        assert!(!batch.calldata().is_empty());
    }

    #[tokio::test]
    async fn first_commit_builds_on_genesis() {
        let store = MemoryBlockStore::new([
            with_status(1, BlockStatus::Pending),
            with_status(2, BlockStatus::Pending),
        ]);

        let batch = next_commit_batch(&store, 1).await.unwrap().unwrap();

        assert_eq!(batch.last_committed, genesis_block_header());
        assert_eq!(batch.heights().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn commit_batch_needs_last_committed_block() {
        let store = MemoryBlockStore::new([with_status(3, BlockStatus::Pending)]);
        assert!(matches!(
            next_commit_batch(&store, 10).await,
            Err(SubmissionError::MissingLastCommitted(2))
        ));
    }

    #[tokio::test]
    async fn nothing_to_submit() {
        let store = MemoryBlockStore::new([with_status(1, BlockStatus::Committed)]);
        assert_eq!(next_commit_batch(&store, 10).await.unwrap(), None);
        assert_eq!(next_verify_batch(&store, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn verify_batch_pairs_proofs_and_marks_verified() {
        let store = MemoryBlockStore::new([
            with_status(1, BlockStatus::Verified),
            with_status(2, BlockStatus::Committed),
            with_status(3, BlockStatus::Committed),
        ]);
        for height in [2, 3] {
            store
                .store_proof(ProofArtifact::new(height, vec![height as u8; 4]))
                .await
                .unwrap();
        }

        let batch = next_verify_batch(&store, 10).await.unwrap().unwrap();
        assert_eq!(batch.heights().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(batch.blocks[1].1, ProofArtifact::new(3, vec![3; 4]));

        mark_verified(&store, &batch).await.unwrap();
        for height in [2, 3] {
            assert_eq!(
                store.get_block(height).await.unwrap().unwrap().status,
                BlockStatus::Verified
            );
        }
        assert_eq!(next_verify_batch(&store, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn proved_block_without_proof_is_an_error() {
        let store = MemoryBlockStore::new([with_status(1, BlockStatus::Proved)]);
        assert!(matches!(
            next_verify_batch(&store, 10).await,
            Err(SubmissionError::Encoding(EncodingError::MissingProof { height: 1 }))
        ));
    }

    #[tokio::test]
    async fn mark_committed_advances_pending_blocks() {
        let store = MemoryBlockStore::new([with_status(1, BlockStatus::Pending)]);
        let batch = next_commit_batch(&store, 10).await.unwrap().unwrap();

        mark_committed(&store, &batch).await.unwrap();

        assert_eq!(
            store.get_block(1).await.unwrap().unwrap().status,
            BlockStatus::Committed
        );
        assert_eq!(next_commit_batch(&store, 10).await.unwrap(), None);
    }
}
