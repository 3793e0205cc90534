use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use futures::StreamExt as _;
use rollup_prover::orchestrator::ProveOrchestrator;
use rollup_prover::prover_state::{KeyPaths, ProvingContext};
use rollup_prover::scheduler::{interval_ticks, ProofScheduler, SchedulerConfig};
use rollup_prover::store::JsonFileBlockStore;
use rollup_prover::submission::{
    mark_committed, mark_verified, next_commit_batch, next_verify_batch,
};
use serde_json::json;
use tracing::{info, warn};

use self::prover_client::cli::{self, Command};

mod prover_client {
    pub mod cli;
}

#[tokio::main]
async fn main() -> Result<()> {
    rollup_prover::load_dotenvy_vars_if_present();
    rollup_prover::tracing::init();

    let args = cli::Cli::parse();
    let key_paths: KeyPaths = args.prover_state_config.into();
    let store = JsonFileBlockStore::new(args.store.blocks_file, args.store.proof_dir);

    match args.command {
        Command::Setup { overwrite } => {
            let (context, key_paths) = tokio::task::spawn_blocking(move || {
                ProvingContext::setup(&key_paths, overwrite).map(|ctx| (ctx, key_paths))
            })
            .await?
            .context("circuit setup failed")?;
            info!(
                digest = %context.circuit_digest(),
                proving_key = %key_paths.proving_key.display(),
                verifying_key = %key_paths.verifying_key.display(),
                "wrote circuit keys"
            );
        }
        Command::Run { scheduler } => {
            let config = SchedulerConfig::from(scheduler);
            let context = tokio::task::spawn_blocking(move || ProvingContext::initialize(&key_paths))
                .await?
                .context("failed to initialize the proving context")?;

            let orchestrator = ProveOrchestrator::new(Arc::new(store), Arc::new(context));
            let scheduler = Arc::new(ProofScheduler::new(orchestrator));
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("cannot listen for ctrl-c, running until killed: {e}");
                    std::future::pending::<()>().await;
                }
                info!("shutting down after the current job");
            };
            scheduler
                .run(interval_ticks(config.interval).take_until(shutdown))
                .await;
        }
        Command::CommitBatch {
            max_blocks,
            mark_submitted,
        } => {
            let Some(batch) = next_commit_batch(&store, max_blocks).await? else {
                info!("no pending blocks");
                return Ok(());
            };
            let heights: Vec<u64> = batch.heights().collect();
            println!(
                "{}",
                json!({
                    "heights": heights,
                    "lastCommittedHash": rollup_common::encode_hex_0x(batch.last_committed.hash()),
                    "calldata": rollup_common::encode_hex_0x(batch.calldata()),
                })
            );
            if mark_submitted {
                mark_committed(&store, &batch)
                    .await
                    .context("failed to record the commit batch")?;
            }
        }
        Command::VerifyBatch {
            max_blocks,
            mark_submitted,
        } => {
            let Some(batch) = next_verify_batch(&store, max_blocks).await? else {
                info!("no proved blocks");
                return Ok(());
            };
            let heights: Vec<u64> = batch.heights().collect();
            println!(
                "{}",
                json!({
                    "heights": heights,
                    "calldata": rollup_common::encode_hex_0x(batch.calldata()),
                })
            );
            if mark_submitted {
                mark_verified(&store, &batch)
                    .await
                    .context("failed to record the verify batch")?;
            }
        }
    }

    Ok(())
}
