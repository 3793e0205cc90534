//! The proof artifact persisted per block.

use serde::{Deserialize, Serialize};

/// A serialized block proof, public inputs included, along with the height
/// of the block it attests.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProofArtifact {
    /// Associated block height.
    pub block_height: u64,
    /// Underlying plonky2 proof, as produced by
    /// `ProofWithPublicInputs::to_bytes`.
    #[serde(with = "rollup_common::hex_0x")]
    pub proof: Vec<u8>,
}

impl ProofArtifact {
    pub fn new(block_height: u64, proof: Vec<u8>) -> Self {
        Self {
            block_height,
            proof,
        }
    }
}

impl AsRef<[u8]> for ProofArtifact {
    fn as_ref(&self) -> &[u8] {
        &self.proof
    }
}
