use serde::Deserialize;
use tracing::debug;

use crate::header::{decode_bytes, decode_json};
use crate::{
    build_stored_block_header, check_batch, BlockRecord, BlockStatus, EncodingError,
    VerifyBlockInfo,
};

/// One entry of a block's pending on-chain operations pubdata, as the
/// sequencer may have written it.
#[derive(Deserialize)]
#[serde(untagged)]
enum PubDataEntry {
    Hex(String),
    Bytes(Vec<u8>),
}

/// Encodes a batch of proved blocks for the on-chain verify-and-execute
/// transaction, pairing each with its stored proof.
///
/// `proof_for` is asked for the proof of every block in order; a proved
/// block without one is a [`EncodingError::MissingProof`].
pub fn encode_verify_blocks<P>(
    blocks: &[BlockRecord],
    mut proof_for: impl FnMut(u64) -> Option<P>,
) -> Result<Vec<(VerifyBlockInfo, P)>, EncodingError> {
    check_batch(
        blocks,
        blocks.first().map(|b| b.height),
        BlockStatus::Proved,
    )?;

    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        let info = encode_verify_block(block)?;
        let proof = proof_for(block.height).ok_or(EncodingError::MissingProof {
            height: block.height,
        })?;
        out.push((info, proof));
    }
    debug!(count = out.len(), "encoded verify batch");
    Ok(out)
}

fn encode_verify_block(block: &BlockRecord) -> Result<VerifyBlockInfo, EncodingError> {
    const FIELD: &str = "pending_onchain_ops_pubdata";

    let entries: Vec<PubDataEntry> =
        decode_json(block.height, FIELD, &block.pending_onchain_ops_pubdata)?;
    let pending_onchain_ops_pubdata = entries
        .into_iter()
        .map(|entry| match entry {
            PubDataEntry::Hex(text) => decode_bytes(block.height, FIELD, &text),
            PubDataEntry::Bytes(bytes) => Ok(bytes),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VerifyBlockInfo {
        header: build_stored_block_header(block)?,
        pending_onchain_ops_pubdata,
    })
}
