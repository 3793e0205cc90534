//! Selects the next block to prove and drives it through witness building,
//! proving and persistence.

use std::sync::Arc;

use block_codec::{
    build_stored_block_header, genesis_block_header, BlockRecord, BlockStatus, EncodingError,
    StoredBlockHeader,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::prover_state::{BlockProver, ProofError};
use crate::store::{BlockStore, StoreError};
use crate::witness::{BlockWitness, WitnessError};

/// What a single [`ProveOrchestrator::prove_next_block`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProveOutcome {
    /// No committed block is awaiting a proof.
    Idle,
    /// The lowest unproved block cannot be proved until its predecessor is.
    WaitingForPredecessor { height: u64 },
    /// A proof was already stored; only the block status was advanced.
    AlreadyProved { height: u64 },
    /// A new proof was generated, verified and stored.
    Proved { height: u64 },
}

impl ProveOutcome {
    pub fn height(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::WaitingForPredecessor { height }
            | Self::AlreadyProved { height }
            | Self::Proved { height } => Some(*height),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProveBlockError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Witness(#[from] WitnessError),
    #[error(transparent)]
    Proof(#[from] ProofError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Proves blocks one at a time, in strictly increasing height order.
#[derive(Debug)]
pub struct ProveOrchestrator<S, P> {
    store: Arc<S>,
    prover: Arc<P>,
}

impl<S, P> Clone for ProveOrchestrator<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            prover: self.prover.clone(),
        }
    }
}

impl<S: BlockStore, P: BlockProver> ProveOrchestrator<S, P> {
    pub fn new(store: Arc<S>, prover: Arc<P>) -> Self {
        Self { store, prover }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Proves the lowest committed block, if its predecessor is proved.
    ///
    /// A block that already has a stored proof is never proved again; its
    /// status is advanced to [`BlockStatus::Proved`] instead. On any error
    /// the block is left as it was.
    pub async fn prove_next_block(&self) -> Result<ProveOutcome, ProveBlockError> {
        let Some(block) = self.lowest_awaiting_proof().await? else {
            debug!("no block awaiting proof");
            return Ok(ProveOutcome::Idle);
        };
        let height = block.height;

        if height == 0 {
            return Err(EncodingError::NonContiguousHeight {
                expected: 1,
                found: 0,
            }
            .into());
        }

        let Some(previous) = self.previous_header(height).await? else {
            debug!(height, "predecessor not proved yet");
            return Ok(ProveOutcome::WaitingForPredecessor { height });
        };

        if self.store.get_proof(height).await?.is_some() {
            info!(height, "proof already stored, marking block proved");
            self.store.update_status(height, BlockStatus::Proved).await?;
            return Ok(ProveOutcome::AlreadyProved { height });
        }

        let witness = BlockWitness::build(previous, &block)?;

        info!(height, "proving block");
        let prover = self.prover.clone();
        let artifact = tokio::task::spawn_blocking(move || {
            let artifact = prover.prove(&witness)?;
            prover.verify(&artifact)?;
            Ok::<_, ProofError>(artifact)
        })
        .await
        .map_err(ProofError::from)??;

        self.store.store_proof(artifact).await?;
        info!(height, "block proved");
        Ok(ProveOutcome::Proved { height })
    }

    /// The lowest committed block. Pending blocks are left alone until they
    /// are committed on chain, so commits never build on an unknown header.
    async fn lowest_awaiting_proof(&self) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self
            .store
            .list_blocks(BlockStatus::Committed, 0)
            .await?
            .into_iter()
            .find(|block| block.status.is_awaiting_proof()))
    }

    /// Header the block at `height` builds on, or `None` while the
    /// predecessor is missing or unproved.
    async fn previous_header(
        &self,
        height: u64,
    ) -> Result<Option<StoredBlockHeader>, ProveBlockError> {
        if height == 1 {
            return Ok(Some(genesis_block_header()));
        }
        match self.store.get_block(height - 1).await? {
            Some(previous) if previous.status.is_proved() => {
                Ok(Some(build_stored_block_header(&previous)?))
            }
            _ => Ok(None),
        }
    }
}
