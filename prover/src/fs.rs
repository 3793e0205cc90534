use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tokio::io::AsyncWriteExt;

use crate::proof_types::ProofArtifact;

pub fn generate_block_proof_file_name(directory: &Path, block_height: u64) -> PathBuf {
    directory.join(format!("b{}.zkproof", block_height))
}

/// Reads the proof stored for `block_height` in `proof_dir`, if any.
pub async fn read_proof_from_dir(
    proof_dir: &Path,
    block_height: u64,
) -> anyhow::Result<Option<ProofArtifact>> {
    let path = generate_block_proof_file_name(proof_dir, block_height);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    let des = &mut serde_json::Deserializer::from_slice(&bytes);
    let mut proofs: Vec<ProofArtifact> = serde_path_to_error::deserialize(des)
        .with_context(|| format!("parsing {}", path.display()))?;
    // Individual proofs are serialized as vector to match other output formats.
    if proofs.len() != 1 {
        return Err(anyhow!(
            "Invalid proof file {}, expected a single element vector.",
            path.display()
        ));
    }
    let proof = proofs.remove(0);
    if proof.block_height != block_height {
        return Err(anyhow!(
            "proof file {} holds a proof for block {}",
            path.display(),
            proof.block_height
        ));
    }

    Ok(Some(proof))
}

/// Write the proof to the `output_dir` directory.
///
/// The file is written next to its final location and renamed into place,
/// so readers never observe a partially written proof.
pub async fn write_proof_to_dir(output_dir: &Path, proof: &ProofArtifact) -> anyhow::Result<()> {
    // Check if output directory exists, and create one if it doesn't.
    if !output_dir.exists() {
        tracing::info!("Created output directory {:?}", output_dir.display());
        tokio::fs::create_dir_all(output_dir).await?;
    }

    let block_proof_file_path = generate_block_proof_file_name(output_dir, proof.block_height);
    let tmp_path = block_proof_file_path.with_extension("zkproof.tmp");

    // Serialize as a single element array to match the expected format.
    let proof_serialized = serde_json::to_vec(&[proof])?;

    let mut f = tokio::fs::File::create(&tmp_path).await?;
    f.write_all(&proof_serialized)
        .await
        .context("Failed to write proof to disk")?;
    f.sync_all().await?;
    tokio::fs::rename(&tmp_path, &block_proof_file_path).await?;

    tracing::info!(
        "Successfully wrote to disk proof file {}",
        block_proof_file_path.display()
    );
    Ok(())
}
