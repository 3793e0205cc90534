use alloy::primitives::U256;
use rollup_common::{EMPTY_STRING_KECCAK, NIL_STATE_ROOT, ZERO_HASH};

use crate::StoredBlockHeader;

/// The header preceding block 1.
///
/// A fixed constant rather than something derived from a record, so the
/// bytes the contract was deployed with are always reproduced exactly.
pub fn genesis_block_header() -> StoredBlockHeader {
    StoredBlockHeader {
        block_number: 0,
        priority_operations: 0,
        pending_onchain_operations_hash: EMPTY_STRING_KECCAK,
        timestamp: U256::ZERO,
        state_root: NIL_STATE_ROOT,
        commitment: ZERO_HASH,
    }
}
