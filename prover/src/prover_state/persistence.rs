use std::{
    fmt::{self, Display},
    fs::{self, OpenOptions},
    io::Write,
    panic::{self, AssertUnwindSafe},
    path::Path,
};

use plonky2::plonk::circuit_data::{ProverCircuitData, VerifierCircuitData};
use plonky2::util::serialization::{DefaultGateSerializer, DefaultGeneratorSerializer, IoError};
use thiserror::Error;

use super::circuit::{C, D, F};

fn get_serializers() -> (DefaultGateSerializer, DefaultGeneratorSerializer<C, D>) {
    let gate_serializer = DefaultGateSerializer;
    let witness_serializer: DefaultGeneratorSerializer<C, D> =
        DefaultGeneratorSerializer::default();

    (gate_serializer, witness_serializer)
}

/// Runs a plonky2 decoder, which panics rather than failing on some
/// malformed inputs, and reports either outcome as a serialization error.
fn decode_key<T>(decode: impl FnOnce() -> Result<T, IoError>) -> Result<T, KeyResourceError> {
    panic::catch_unwind(AssertUnwindSafe(decode))
        .unwrap_or(Err(IoError))
        .map_err(KeyResourceError::Serialization)
}

/// Which of the two key files a resource is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Proving,
    Verifying,
}

impl Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Proving => write!(f, "proving"),
            KeyKind::Verifying => write!(f, "verifying"),
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum KeyResourceError {
    #[error("Serialization error: {0}")]
    Serialization(IoError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A key that may be written to and read from disk, each with its own
/// serialization and deserialization logic.
pub(crate) trait KeyResource {
    /// The in-memory key.
    type Resource;

    const KIND: KeyKind;

    /// Serializes the key to bytes.
    fn serialize(r: &Self::Resource) -> Result<Vec<u8>, KeyResourceError>;

    /// Deserializes the key from bytes.
    fn deserialize(bytes: &[u8]) -> Result<Self::Resource, KeyResourceError>;

    /// Reads the key from disk and deserializes it.
    fn get(path: &Path) -> Result<Self::Resource, KeyResourceError> {
        Self::deserialize(&fs::read(path)?)
    }

    /// Writes the key to disk after serializing it.
    fn put(path: &Path, r: &Self::Resource) -> Result<(), KeyResourceError> {
        // Create the base folder if non-existent.
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = Self::serialize(r)?;
        Ok(OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?
            .write_all(&bytes)?)
    }
}

/// The proving key: prover-only circuit data plus the common data.
#[derive(Debug, Default)]
pub(crate) struct ProvingKeyResource;

impl KeyResource for ProvingKeyResource {
    type Resource = ProverCircuitData<F, C, D>;

    const KIND: KeyKind = KeyKind::Proving;

    fn serialize(r: &Self::Resource) -> Result<Vec<u8>, KeyResourceError> {
        let (gate_serializer, witness_serializer) = get_serializers();
        r.to_bytes(&gate_serializer, &witness_serializer)
            .map_err(KeyResourceError::Serialization)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self::Resource, KeyResourceError> {
        let (gate_serializer, witness_serializer) = get_serializers();
        decode_key(|| {
            ProverCircuitData::from_bytes(bytes, &gate_serializer, &witness_serializer)
        })
    }
}

/// The verifying key: verifier-only circuit data plus the common data.
#[derive(Debug, Default)]
pub(crate) struct VerifyingKeyResource;

impl KeyResource for VerifyingKeyResource {
    type Resource = VerifierCircuitData<F, C, D>;

    const KIND: KeyKind = KeyKind::Verifying;

    fn serialize(r: &Self::Resource) -> Result<Vec<u8>, KeyResourceError> {
        let (gate_serializer, _witness_serializer) = get_serializers();
        r.to_bytes(&gate_serializer)
            .map_err(KeyResourceError::Serialization)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self::Resource, KeyResourceError> {
        let (gate_serializer, _) = get_serializers();
        decode_key(|| VerifierCircuitData::from_bytes(bytes.to_vec(), &gate_serializer))
    }
}
