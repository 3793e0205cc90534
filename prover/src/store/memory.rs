use std::collections::BTreeMap;

use block_codec::{BlockRecord, BlockStatus};
use parking_lot::Mutex;

use super::{check_transition, BlockStore, StoreError};
use crate::proof_types::ProofArtifact;

#[derive(Debug, Default)]
struct Inner {
    blocks: BTreeMap<u64, BlockRecord>,
    proofs: BTreeMap<u64, ProofArtifact>,
}

/// A [`BlockStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    inner: Mutex<Inner>,
}

impl MemoryBlockStore {
    pub fn new(blocks: impl IntoIterator<Item = BlockRecord>) -> Self {
        let store = Self::default();
        for block in blocks {
            store.insert_block(block);
        }
        store
    }

    /// Adds or replaces a block record, as block production would.
    pub fn insert_block(&self, block: BlockRecord) {
        self.inner.lock().blocks.insert(block.height, block);
    }

    fn put_proof_locked(inner: &mut Inner, proof: ProofArtifact) -> Result<(), StoreError> {
        if inner.proofs.contains_key(&proof.block_height) {
            return Err(StoreError::ProofExists(proof.block_height));
        }
        inner.proofs.insert(proof.block_height, proof);
        Ok(())
    }
}

impl BlockStore for MemoryBlockStore {
    async fn list_blocks(
        &self,
        status: BlockStatus,
        from_height: u64,
    ) -> Result<Vec<BlockRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .blocks
            .range(from_height..)
            .map(|(_, block)| block)
            .filter(|block| block.status == status)
            .cloned()
            .collect())
    }

    async fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.inner.lock().blocks.get(&height).cloned())
    }

    async fn update_status(&self, height: u64, status: BlockStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let block = inner
            .blocks
            .get_mut(&height)
            .ok_or(StoreError::UnknownBlock(height))?;
        check_transition(height, block.status, status)?;
        block.status = status;
        Ok(())
    }

    async fn get_proof(&self, height: u64) -> Result<Option<ProofArtifact>, StoreError> {
        Ok(self.inner.lock().proofs.get(&height).cloned())
    }

    async fn put_proof(&self, proof: ProofArtifact) -> Result<(), StoreError> {
        Self::put_proof_locked(&mut self.inner.lock(), proof)
    }

    async fn store_proof(&self, proof: ProofArtifact) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let height = proof.block_height;
        let from = inner
            .blocks
            .get(&height)
            .ok_or(StoreError::UnknownBlock(height))?
            .status;
        check_transition(height, from, BlockStatus::Proved)?;
        Self::put_proof_locked(&mut inner, proof)?;
        if let Some(block) = inner.blocks.get_mut(&height) {
            block.status = BlockStatus::Proved;
        }
        Ok(())
    }
}
