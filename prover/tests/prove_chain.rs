//! Proves a short chain with the real circuit, through the scheduler and both
//! block stores.

mod common;

use std::sync::Arc;

use block_codec::{BlockRecord, BlockStatus};
use pretty_assertions::assert_eq;
use rollup_prover::orchestrator::{ProveOrchestrator, ProveOutcome};
use rollup_prover::scheduler::{ProofScheduler, TickOutcome};
use rollup_prover::store::{BlockStore, JsonFileBlockStore, MemoryBlockStore};
use rollup_prover::submission::{
    mark_committed, mark_verified, next_commit_batch, next_verify_batch,
};

#[tokio::test(flavor = "multi_thread")]
async fn scheduler_proves_chain_in_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let context = common::proving_context(dir.path())?;

    let mut blocks = common::chain(3);
    blocks[2].status = BlockStatus::Pending;
    let store = Arc::new(MemoryBlockStore::new(blocks));
    let scheduler = ProofScheduler::new(ProveOrchestrator::new(store.clone(), context.clone()));

    for height in 1..=2 {
        assert_eq!(
            scheduler.tick().await,
            TickOutcome::Completed(ProveOutcome::Proved { height })
        );
    }
    // Block 3 is not committed yet, so it is left alone.
    assert_eq!(
        scheduler.tick().await,
        TickOutcome::Completed(ProveOutcome::Idle)
    );
    assert_eq!(store.get_proof(3).await?, None);

    let commit = next_commit_batch(store.as_ref(), 10).await?.unwrap();
    assert_eq!(commit.heights().collect::<Vec<_>>(), vec![3]);
    assert_eq!(commit.last_committed.block_number, 2);
    mark_committed(store.as_ref(), &commit).await?;

    assert_eq!(
        scheduler.tick().await,
        TickOutcome::Completed(ProveOutcome::Proved { height: 3 })
    );
    assert_eq!(
        scheduler.tick().await,
        TickOutcome::Completed(ProveOutcome::Idle)
    );

    let mut proofs = vec![];
    for height in 1..=3 {
        let block = store.get_block(height).await?.unwrap();
        assert_eq!(block.status, BlockStatus::Proved);
        let proof = store.get_proof(height).await?.unwrap();
        context.verify(&proof)?;
        proofs.push(proof);
    }

    // A second pass leaves every stored proof untouched.
    assert_eq!(
        scheduler.tick().await,
        TickOutcome::Completed(ProveOutcome::Idle)
    );
    for (height, proof) in (1..=3).zip(&proofs) {
        assert_eq!(store.get_proof(height).await?.as_ref(), Some(proof));
    }

    let batch = next_verify_batch(store.as_ref(), 10).await?.unwrap();
    assert_eq!(batch.heights().collect::<Vec<_>>(), vec![1, 2, 3]);
    mark_verified(store.as_ref(), &batch).await?;
    assert_eq!(
        store.list_blocks(BlockStatus::Verified, 0).await?.len(),
        3
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn json_store_survives_restart_without_reproving() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let context = common::proving_context(dir.path())?;

    let blocks_path = dir.path().join("blocks.json");
    let proof_dir = dir.path().join("proofs");
    std::fs::write(&blocks_path, serde_json::to_vec_pretty(&common::chain(2))?)?;

    let store = Arc::new(JsonFileBlockStore::new(&blocks_path, &proof_dir));
    let orchestrator = ProveOrchestrator::new(store, context.clone());
    assert_eq!(
        orchestrator.prove_next_block().await?,
        ProveOutcome::Proved { height: 1 }
    );
    let first_proof = std::fs::read(proof_dir.join("b1.zkproof"))?;

    // Simulate a crash between the proof write and the status update.
    let mut records: Vec<BlockRecord> = serde_json::from_slice(&std::fs::read(&blocks_path)?)?;
    assert_eq!(records[0].status, BlockStatus::Proved);
    records[0].status = BlockStatus::Committed;
    std::fs::write(&blocks_path, serde_json::to_vec_pretty(&records)?)?;

    let restarted = ProveOrchestrator::new(
        Arc::new(JsonFileBlockStore::new(&blocks_path, &proof_dir)),
        context,
    );
    assert_eq!(
        restarted.prove_next_block().await?,
        ProveOutcome::AlreadyProved { height: 1 }
    );
    assert_eq!(std::fs::read(proof_dir.join("b1.zkproof"))?, first_proof);
    assert_eq!(
        restarted.prove_next_block().await?,
        ProveOutcome::Proved { height: 2 }
    );
    assert_eq!(
        restarted.store().get_block(2).await?.unwrap().status,
        BlockStatus::Proved
    );
    Ok(())
}
