use std::path::Path;
use std::sync::Arc;

use block_codec::{BlockRecord, BlockStatus};
use rollup_common::{encode_hex_0x, keccak256, EMPTY_STRING_KECCAK};
use rollup_prover::prover_state::{KeyPaths, ProvingContext};

/// A chain of committed blocks `1..=len`, with distinct roots and payloads.
pub fn chain(len: u64) -> Vec<BlockRecord> {
    (1..=len)
        .map(|height| {
            let public_data: Vec<u8> = (0..height as u8 * 8).collect();
            BlockRecord {
                height,
                state_root: encode_hex_0x(keccak256(height.to_be_bytes())),
                commitment: encode_hex_0x(keccak256(&public_data)),
                pending_onchain_ops_hash: encode_hex_0x(EMPTY_STRING_KECCAK),
                public_data: encode_hex_0x(&public_data),
                public_data_offsets: "[0]".to_string(),
                pending_onchain_ops_pubdata: r#"["0x00ff"]"#.to_string(),
                priority_operations: height % 2,
                created_at: 1_700_000_000_000 + height * 1_000,
                status: BlockStatus::Committed,
            }
        })
        .collect()
}

/// Keys written by a fresh setup under `dir`, loaded back as a production
/// run would.
pub fn proving_context(dir: &Path) -> anyhow::Result<Arc<ProvingContext>> {
    let paths = KeyPaths {
        proving_key: dir.join("keys").join("block.pk"),
        verifying_key: dir.join("keys").join("block.vk"),
    };
    ProvingContext::setup(&paths, false)?;
    Ok(Arc::new(ProvingContext::initialize(&paths)?))
}
