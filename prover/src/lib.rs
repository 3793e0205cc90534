//! Proof scheduling for rollup blocks.
//!
//! A [`scheduler::ProofScheduler`] periodically asks the
//! [`orchestrator::ProveOrchestrator`] to prove the next block. The
//! orchestrator picks the lowest block whose predecessors are all proved,
//! builds its [`witness::BlockWitness`], proves it with the process-wide
//! [`prover_state::ProvingContext`] and persists the result through a
//! [`store::BlockStore`].

pub mod fs;
pub mod orchestrator;
pub mod proof_types;
pub mod prover_state;
pub mod scheduler;
pub mod store;
pub mod submission;
pub mod tracing;
pub mod witness;

/// Common information for the `--version` CLI flags.
pub fn version() -> String {
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    let circuit = prover_state::circuit::CIRCUIT_NAME;
    format!("{pkg_name} {pkg_version} (circuit: {circuit})")
}

/// Loads variables from a `.env` file in the working directory, if one
/// exists. Variables already set in the environment take precedence.
pub fn load_dotenvy_vars_if_present() {
    match dotenvy::dotenv() {
        Ok(path) => ::tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("ignoring malformed .env file: {e}"),
    }
}
