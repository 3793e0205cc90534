//! Process-lifetime prover state.
//!
//! This module provides the following:
//! - [`ProvingContext`], holding the compiled block circuit together with the
//!   proving and verifying keys loaded from disk. It is built once at start-up
//!   and shared read-only afterwards.
//! - The [`BlockProver`] seam through which the orchestrator reaches it.
//! - Command line arguments for locating the key files.
//! - Persistence utilities for saving and loading the keys.
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use plonky2::field::types::PrimeField64;
use plonky2::hash::hash_types::HashOut;
use plonky2::iop::witness::PartialWitness;
use plonky2::plonk::circuit_data::{CircuitData, ProverCircuitData, VerifierCircuitData};
use plonky2::plonk::proof::ProofWithPublicInputs;
use plonky2::util::serialization::IoError;
use thiserror::Error;
use tracing::info;

use self::circuit::{BlockCircuit, BLOCK_NUMBER_INDEX, C, D, F};
pub use self::persistence::KeyKind;
use self::persistence::{KeyResource, KeyResourceError, ProvingKeyResource, VerifyingKeyResource};
use crate::proof_types::ProofArtifact;
use crate::witness::BlockWitness;

pub mod circuit;
pub mod cli;
pub mod persistence;

/// Locations of the two key files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPaths {
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
}

impl KeyPaths {
    fn iter(&self) -> impl Iterator<Item = (KeyKind, &Path)> {
        [
            (KeyKind::Proving, self.proving_key.as_path()),
            (KeyKind::Verifying, self.verifying_key.as_path()),
        ]
        .into_iter()
    }
}

/// Failure to bring up the [`ProvingContext`]. Always fatal.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("block circuit failed to compile")]
    CircuitCompilation,
    #[error("cannot access {kind} key at {}: {source}", .path.display())]
    KeyIo {
        kind: KeyKind,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{kind} key at {} is corrupt: {reason}", .path.display())]
    CorruptKey {
        kind: KeyKind,
        path: PathBuf,
        reason: IoError,
    },
    #[error("{kind} key could not be serialized: {reason}")]
    KeySerialization { kind: KeyKind, reason: IoError },
    #[error("{kind} key at {} was generated for circuit {found}, expected {expected}", .path.display())]
    KeyMismatch {
        kind: KeyKind,
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("{kind} key already exists at {}", .path.display())]
    KeyExists { kind: KeyKind, path: PathBuf },
}

impl InitializationError {
    fn load(kind: KeyKind, path: &Path, e: KeyResourceError) -> Self {
        match e {
            KeyResourceError::IoError(source) => Self::KeyIo {
                kind,
                path: path.to_owned(),
                source,
            },
            KeyResourceError::Serialization(reason) => Self::CorruptKey {
                kind,
                path: path.to_owned(),
                reason,
            },
        }
    }

    fn store(kind: KeyKind, path: &Path, e: KeyResourceError) -> Self {
        match e {
            KeyResourceError::IoError(source) => Self::KeyIo {
                kind,
                path: path.to_owned(),
                source,
            },
            KeyResourceError::Serialization(reason) => Self::KeySerialization { kind, reason },
        }
    }
}

/// Failure to produce or check a single block proof. The block is left
/// untouched and retried on the next tick.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("proof generation for block {height} failed: {source}")]
    Prove {
        height: u64,
        source: anyhow::Error,
    },
    #[error("proof for block {height} cannot be decoded: {source}")]
    Decode {
        height: u64,
        source: anyhow::Error,
    },
    #[error("proof stored for block {height} attests block {found:?}")]
    WrongBlock { height: u64, found: Option<u64> },
    #[error("proof for block {height} failed verification: {source}")]
    Verify {
        height: u64,
        source: anyhow::Error,
    },
    #[error("proving task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Something that can prove and check block transitions.
///
/// Proving is CPU-bound and blocking; callers are expected to run it off the
/// async executor.
pub trait BlockProver: Send + Sync + 'static {
    fn prove(&self, witness: &BlockWitness) -> Result<ProofArtifact, ProofError>;

    fn verify(&self, proof: &ProofArtifact) -> Result<(), ProofError>;
}

/// The compiled block circuit and its keys.
pub struct ProvingContext {
    circuit: BlockCircuit,
    prover: ProverCircuitData<F, C, D>,
    verifier: VerifierCircuitData<F, C, D>,
}

impl std::fmt::Debug for ProvingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvingContext")
            .field("circuit_digest", &self.circuit_digest())
            .finish_non_exhaustive()
    }
}

fn compile() -> Result<(CircuitData<F, C, D>, BlockCircuit), InitializationError> {
    info!("compiling {} circuit...", circuit::CIRCUIT_NAME);
    panic::catch_unwind(BlockCircuit::build).map_err(|_| InitializationError::CircuitCompilation)
}

fn digest_hex(digest: &HashOut<F>) -> String {
    digest
        .elements
        .iter()
        .map(|e| format!("{:016x}", e.to_canonical_u64()))
        .collect()
}

fn check_digest(
    kind: KeyKind,
    path: &Path,
    expected: &HashOut<F>,
    found: &HashOut<F>,
) -> Result<(), InitializationError> {
    if expected == found {
        return Ok(());
    }
    Err(InitializationError::KeyMismatch {
        kind,
        path: path.to_owned(),
        expected: digest_hex(expected),
        found: digest_hex(found),
    })
}

impl ProvingContext {
    /// Compiles the circuit and loads both keys, checking that they were
    /// generated for this very circuit.
    pub fn initialize(paths: &KeyPaths) -> Result<Self, InitializationError> {
        info!("initializing proving context...");
        let (data, circuit) = compile()?;
        let expected = data.verifier_only.circuit_digest;

        info!("loading proving key from {}", paths.proving_key.display());
        let prover = ProvingKeyResource::get(&paths.proving_key).map_err(|e| {
            InitializationError::load(ProvingKeyResource::KIND, &paths.proving_key, e)
        })?;
        check_digest(
            KeyKind::Proving,
            &paths.proving_key,
            &expected,
            &prover.prover_only.circuit_digest,
        )?;

        info!("loading verifying key from {}", paths.verifying_key.display());
        let verifier = VerifyingKeyResource::get(&paths.verifying_key).map_err(|e| {
            InitializationError::load(VerifyingKeyResource::KIND, &paths.verifying_key, e)
        })?;
        check_digest(
            KeyKind::Verifying,
            &paths.verifying_key,
            &expected,
            &verifier.verifier_only.circuit_digest,
        )?;

        let context = Self {
            circuit,
            prover,
            verifier,
        };
        info!(digest = %context.circuit_digest(), "proving context ready");
        Ok(context)
    }

    /// Compiles the circuit and writes a fresh pair of keys.
    ///
    /// Existing key files are left alone unless `overwrite` is set.
    pub fn setup(paths: &KeyPaths, overwrite: bool) -> Result<Self, InitializationError> {
        if !overwrite {
            if let Some((kind, path)) = paths.iter().find(|(_, path)| path.exists()) {
                return Err(InitializationError::KeyExists {
                    kind,
                    path: path.to_owned(),
                });
            }
        }

        let (data, circuit) = compile()?;
        let verifier = data.verifier_data();
        let prover = data.prover_data();

        ProvingKeyResource::put(&paths.proving_key, &prover)
            .map_err(|e| InitializationError::store(KeyKind::Proving, &paths.proving_key, e))?;
        info!("wrote proving key to {}", paths.proving_key.display());
        VerifyingKeyResource::put(&paths.verifying_key, &verifier).map_err(|e| {
            InitializationError::store(KeyKind::Verifying, &paths.verifying_key, e)
        })?;
        info!("wrote verifying key to {}", paths.verifying_key.display());

        Ok(Self {
            circuit,
            prover,
            verifier,
        })
    }

    /// Hex digest of the circuit the keys belong to.
    pub fn circuit_digest(&self) -> String {
        digest_hex(&self.verifier.verifier_only.circuit_digest)
    }

    /// Proves the transition described by `witness`.
    pub fn prove(&self, witness: &BlockWitness) -> Result<ProofArtifact, ProofError> {
        let height = u64::from(witness.block_number());
        let mut pw = PartialWitness::new();
        self.circuit
            .set_witness(&mut pw, witness)
            .map_err(|source| ProofError::Prove { height, source })?;

        let proof = self
            .prover
            .prove(pw)
            .map_err(|source| ProofError::Prove { height, source })?;
        Ok(ProofArtifact::new(height, proof.to_bytes()))
    }

    /// Checks `artifact` against the verifying key, and that it attests the
    /// block it is stored for.
    pub fn verify(&self, artifact: &ProofArtifact) -> Result<(), ProofError> {
        let height = artifact.block_height;
        // The plonky2 decoder panics on some truncated inputs.
        let proof = panic::catch_unwind(AssertUnwindSafe(|| {
            ProofWithPublicInputs::<F, C, D>::from_bytes(
                artifact.proof.clone(),
                &self.verifier.common,
            )
        }))
        .unwrap_or_else(|_| Err(anyhow::anyhow!("decoder panicked")))
        .map_err(|source| ProofError::Decode { height, source })?;

        let found = proof
            .public_inputs
            .get(BLOCK_NUMBER_INDEX)
            .map(|e| e.to_canonical_u64());
        if found != Some(height) {
            return Err(ProofError::WrongBlock { height, found });
        }

        self.verifier
            .verify(proof)
            .map_err(|source| ProofError::Verify { height, source })
    }
}

impl BlockProver for ProvingContext {
    fn prove(&self, witness: &BlockWitness) -> Result<ProofArtifact, ProofError> {
        ProvingContext::prove(self, witness)
    }

    fn verify(&self, proof: &ProofArtifact) -> Result<(), ProofError> {
        ProvingContext::verify(self, proof)
    }
}

#[cfg(test)]
mod tests {
    use block_codec::genesis_block_header;

    use super::*;
    use crate::testing_utils::record;

    fn key_paths(dir: &Path) -> KeyPaths {
        KeyPaths {
            proving_key: dir.join("block.pk"),
            verifying_key: dir.join("block.vk"),
        }
    }

    #[test]
    fn setup_then_initialize_and_prove() {
        let dir = tempfile::tempdir().unwrap();
        let paths = key_paths(dir.path());

        let fresh = ProvingContext::setup(&paths, false).unwrap();
        let loaded = ProvingContext::initialize(&paths).unwrap();
        assert_eq!(fresh.circuit_digest(), loaded.circuit_digest());

        let witness = BlockWitness::build(genesis_block_header(), &record(1)).unwrap();
        let artifact = loaded.prove(&witness).unwrap();
        assert_eq!(artifact.block_height, 1);
        fresh.verify(&artifact).unwrap();
    }

    #[test]
    fn setup_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let paths = key_paths(dir.path());
        std::fs::write(&paths.verifying_key, b"keep me").unwrap();

        assert!(matches!(
            ProvingContext::setup(&paths, false),
            Err(InitializationError::KeyExists {
                kind: KeyKind::Verifying,
                ..
            })
        ));
        assert_eq!(std::fs::read(&paths.verifying_key).unwrap(), b"keep me");
    }

    #[test]
    fn initialize_fails_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProvingContext::initialize(&key_paths(dir.path())),
            Err(InitializationError::KeyIo {
                kind: KeyKind::Proving,
                ..
            })
        ));
    }

    #[test]
    fn initialize_fails_on_corrupt_key() {
        let dir = tempfile::tempdir().unwrap();
        let paths = key_paths(dir.path());
        ProvingContext::setup(&paths, false).unwrap();
        std::fs::write(&paths.verifying_key, b"garbage").unwrap();

        assert!(matches!(
            ProvingContext::initialize(&paths),
            Err(InitializationError::CorruptKey {
                kind: KeyKind::Verifying,
                ..
            })
        ));
    }

    #[test]
    fn verify_rejects_proof_for_other_height() {
        let dir = tempfile::tempdir().unwrap();
        let context = ProvingContext::setup(&key_paths(dir.path()), false).unwrap();
        let witness = BlockWitness::build(genesis_block_header(), &record(1)).unwrap();
        let mut artifact = context.prove(&witness).unwrap();
        artifact.block_height = 2;

        assert!(matches!(
            context.verify(&artifact),
            Err(ProofError::WrongBlock {
                height: 2,
                found: Some(1)
            })
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let context = ProvingContext::setup(&key_paths(dir.path()), false).unwrap();
        assert!(matches!(
            context.verify(&ProofArtifact::new(1, vec![1, 2, 3])),
            Err(ProofError::Decode { height: 1, .. })
        ));
    }

    #[test]
    fn verify_rejects_truncated_proof() {
        let dir = tempfile::tempdir().unwrap();
        let context = ProvingContext::setup(&key_paths(dir.path()), false).unwrap();
        let witness = BlockWitness::build(genesis_block_header(), &record(1)).unwrap();
        let mut artifact = context.prove(&witness).unwrap();
        artifact.proof.truncate(artifact.proof.len() / 2);

        assert!(matches!(
            context.verify(&artifact),
            Err(ProofError::Decode { height: 1, .. })
        ));
    }
}
