use thiserror::Error;

use crate::BlockStatus;

/// Failure to turn a block record into an on-chain structure.
///
/// Every variant names the offending block so a failed batch can be traced
/// back to the record that poisoned it.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("block {height}: field `{field}` is not valid hex: {source}")]
    InvalidHex {
        height: u64,
        field: &'static str,
        source: hex::FromHexError,
    },

    #[error("block {height}: field `{field}` holds {actual} bytes, expected {expected}")]
    InvalidHexLength {
        height: u64,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("block {height}: field `{field}` is not well-formed json: {source}")]
    MalformedJson {
        height: u64,
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("block heights must be contiguous: expected {expected}, found {found}")]
    NonContiguousHeight { expected: u64, found: u64 },

    #[error("block {height} has no stored proof")]
    MissingProof { height: u64 },

    #[error("block {height} has status {found}, expected {expected}")]
    UnexpectedStatus {
        height: u64,
        expected: BlockStatus,
        found: BlockStatus,
    },

    #[error("block {height} does not fit in an on-chain block number")]
    HeightOverflow { height: u64 },
}

impl EncodingError {
    /// The block height the error was raised for.
    pub fn height(&self) -> u64 {
        match self {
            EncodingError::InvalidHex { height, .. }
            | EncodingError::InvalidHexLength { height, .. }
            | EncodingError::MalformedJson { height, .. }
            | EncodingError::MissingProof { height }
            | EncodingError::UnexpectedStatus { height, .. }
            | EncodingError::HeightOverflow { height } => *height,
            EncodingError::NonContiguousHeight { found, .. } => *found,
        }
    }
}
