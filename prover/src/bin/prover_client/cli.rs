use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};
use rollup_prover::prover_state::cli::CliProverStateConfig;
use rollup_prover::scheduler::cli::CliSchedulerConfig;

const STORE_HELP_HEADING: &str = "Block store options";

/// Rollup block prover client
#[derive(Parser)]
#[command(version = rollup_prover::version(), propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[clap(flatten)]
    pub(crate) prover_state_config: CliProverStateConfig,

    #[clap(flatten)]
    pub(crate) store: CliStoreConfig,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CliStoreConfig {
    /// JSON file holding the array of block records.
    #[arg(long, help_heading = STORE_HELP_HEADING, env = "PROVER_BLOCKS_FILE", value_hint = ValueHint::FilePath, default_value = "blocks.json")]
    pub(crate) blocks_file: PathBuf,
    /// Directory the block proofs are written to.
    #[arg(long, help_heading = STORE_HELP_HEADING, env = "PROVER_PROOF_DIR", value_hint = ValueHint::DirPath, default_value = "proofs")]
    pub(crate) proof_dir: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Compiles the block circuit and writes its proving and verifying keys.
    Setup {
        /// Replace key files that already exist.
        #[arg(long)]
        overwrite: bool,
    },
    /// Proves blocks as they become ready, until interrupted.
    Run {
        #[clap(flatten)]
        scheduler: CliSchedulerConfig,
    },
    /// Prints the calldata of the next `commitBlocks` transaction.
    CommitBatch {
        /// Upper bound on the number of blocks in the batch.
        #[arg(long, env = "PROVER_MAX_BATCH_BLOCKS", default_value_t = 32)]
        max_blocks: usize,
        /// Record the batch as committed once printed.
        #[arg(long)]
        mark_submitted: bool,
    },
    /// Prints the calldata of the next `verifyAndExecuteBlocks` transaction.
    VerifyBatch {
        /// Upper bound on the number of blocks in the batch.
        #[arg(long, env = "PROVER_MAX_BATCH_BLOCKS", default_value_t = 32)]
        max_blocks: usize,
        /// Record the batch as verified once printed.
        #[arg(long)]
        mark_submitted: bool,
    },
}
