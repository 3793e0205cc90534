//! Access to persisted block records and their proofs.

use std::future::Future;
use std::path::PathBuf;

use block_codec::{BlockRecord, BlockStatus};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::proof_types::ProofArtifact;

mod json_file;
mod memory;

pub use json_file::JsonFileBlockStore;
pub use memory::MemoryBlockStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block {0} is not in the store")]
    UnknownBlock(u64),
    #[error("block {height} cannot move from {from} to {to}")]
    IllegalTransition {
        height: u64,
        from: BlockStatus,
        to: BlockStatus,
    },
    #[error("a proof for block {0} is already stored")]
    ProofExists(u64),
    #[error("malformed block file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("block file holds block {0} more than once")]
    DuplicateHeight(u64),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("block file lock {} is held by another writer", .0.display())]
    Locked(PathBuf),
    #[error("proof file error: {0:#}")]
    ProofFile(#[source] anyhow::Error),
}

/// Statuses only ever move forward, and a verified block is never touched.
pub(crate) fn check_transition(
    height: u64,
    from: BlockStatus,
    to: BlockStatus,
) -> Result<(), StoreError> {
    if to < from {
        return Err(StoreError::IllegalTransition { height, from, to });
    }
    Ok(())
}

/// Block records and proofs, keyed by height.
#[cfg_attr(test, automock)]
pub trait BlockStore: Send + Sync + 'static {
    /// Blocks with `status` and a height of at least `from_height`, in
    /// ascending height order.
    fn list_blocks(
        &self,
        status: BlockStatus,
        from_height: u64,
    ) -> impl Future<Output = Result<Vec<BlockRecord>, StoreError>> + Send;

    fn get_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<BlockRecord>, StoreError>> + Send;

    fn update_status(
        &self,
        height: u64,
        status: BlockStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_proof(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<ProofArtifact>, StoreError>> + Send;

    /// Stores `proof` under its block height. An existing proof is never
    /// overwritten.
    fn put_proof(&self, proof: ProofArtifact)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// [`put_proof`](BlockStore::put_proof) followed by a move to
    /// [`BlockStatus::Proved`]. On error neither is left behind. A crash
    /// part way may leave the proof without the status change, which
    /// [`ProveOrchestrator`](crate::orchestrator::ProveOrchestrator) heals
    /// on its next pass.
    fn store_proof(
        &self,
        proof: ProofArtifact,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
