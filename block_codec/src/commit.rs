use tracing::debug;

use crate::header::{block_number, decode_bytes, decode_hash, decode_json, timestamp};
use crate::{check_batch, BlockRecord, BlockStatus, CommitBlockInfo, EncodingError};

/// Encodes a batch of pending blocks for the on-chain commit transaction.
///
/// `blocks` must be pending, ascending and start right after
/// `last_committed_height`. The whole batch fails on the first bad record.
pub fn encode_commit_blocks(
    last_committed_height: u64,
    blocks: &[BlockRecord],
) -> Result<Vec<CommitBlockInfo>, EncodingError> {
    let first_height = last_committed_height
        .checked_add(1)
        .ok_or(EncodingError::HeightOverflow {
            height: last_committed_height,
        })?;
    check_batch(blocks, Some(first_height), BlockStatus::Pending)?;
    let infos = blocks
        .iter()
        .map(encode_commit_block)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        last_committed_height,
        count = infos.len(),
        "encoded commit batch"
    );
    Ok(infos)
}

/// Encodes one block record, without any batch ordering or status checks.
pub fn encode_commit_block(block: &BlockRecord) -> Result<CommitBlockInfo, EncodingError> {
    Ok(CommitBlockInfo {
        new_state_root: decode_hash(block.height, "state_root", &block.state_root)?,
        public_data: decode_bytes(block.height, "public_data", &block.public_data)?,
        timestamp: timestamp(block),
        public_data_offsets: decode_json(
            block.height,
            "public_data_offsets",
            &block.public_data_offsets,
        )?,
        block_number: block_number(block.height)?,
    })
}
