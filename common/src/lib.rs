use hex_literal::hex;

/// Width in bytes of every hash field stored on chain.
pub const HASH_LEN: usize = 32;

/// A 32-byte on-chain hash value.
pub type Hash32 = [u8; HASH_LEN];

/// The keccak256 hash of the empty byte string.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const EMPTY_STRING_KECCAK: Hash32 =
    hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// The state root of a rollup state tree holding no accounts: the keccak256
/// hash of an all-zero 32-byte leaf.
/// 0x290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563
pub const NIL_STATE_ROOT: Hash32 =
    hex!("290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563");

/// The all-zero 32-byte value.
pub const ZERO_HASH: Hash32 = [0u8; HASH_LEN];

/// Computes the keccak256 digest of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> Hash32 {
    keccak_hash::keccak(data).0
}

/// Strips an optional leading `0x` / `0X` prefix.
pub fn strip_0x(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

/// Decodes hex text, tolerating a leading `0x` prefix.
///
/// An empty string (or a bare `0x`) decodes to an empty byte vector.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(strip_0x(text.trim()))
}

/// Encodes bytes as lowercase hex with a leading `0x`.
pub fn encode_hex_0x(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Like `#[serde(with = "::hex")]`, but tolerates and emits leading `0x`
/// prefixes
pub mod hex_0x {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T>(data: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: hex::ToHex,
    {
        let s = data.encode_hex::<String>();
        serializer.serialize_str(&format!("0x{}", s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T>(deserializer: D) -> Result<T, D::Error>
    where
        T: hex::FromHex,
        T::Error: std::fmt::Display,
    {
        let s = String::deserialize(deserializer)?;
        T::from_hex(super::strip_0x(&s)).map_err(D::Error::custom)
    }

    /// The same convention applied to every entry of a sequence.
    pub mod vec {
        use serde::{de::Error as _, ser::SerializeSeq as _, Deserialize as _};
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(data: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(data.len()))?;
            for entry in data {
                seq.serialize_element(&crate::encode_hex_0x(entry))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|s| crate::decode_hex(s).map_err(D::Error::custom))
                .collect()
        }
    }
}

#[test]
fn test_empty_string_keccak() {
    assert_eq!(EMPTY_STRING_KECCAK, keccak256([]));
}

#[test]
fn test_nil_state_root() {
    assert_eq!(NIL_STATE_ROOT, keccak256(ZERO_HASH));
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0x0102", vec![1, 2])]
    #[case("0X0102", vec![1, 2])]
    #[case("0102", vec![1, 2])]
    #[case("", vec![])]
    #[case("0x", vec![])]
    fn decodes_with_or_without_prefix(#[case] text: &str, #[case] expected: Vec<u8>) {
        assert_eq!(decode_hex(text).unwrap(), expected);
    }

    #[test]
    fn rejects_odd_length() {
        assert_eq!(decode_hex("abc"), Err(hex::FromHexError::OddLength));
    }

    #[test]
    fn encodes_with_prefix() {
        assert_eq!(encode_hex_0x([0xab, 0x01]), "0xab01");
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payload {
        #[serde(with = "hex_0x")]
        hash: [u8; 2],
        #[serde(with = "hex_0x")]
        proof: Vec<u8>,
        #[serde(with = "hex_0x::vec")]
        entries: Vec<Vec<u8>>,
    }

    #[test]
    fn serde_emits_prefix_and_accepts_either_form() {
        let payload = Payload {
            hash: [0xab, 0xcd],
            proof: vec![1, 2, 3],
            entries: vec![vec![], vec![0xff]],
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"hash":"0xabcd","proof":"0x010203","entries":["0x","0xff"]}"#
        );

        let parsed: Payload = serde_json::from_str(
            r#"{"hash":"abcd","proof":"0x010203","entries":["","0XFF"]}"#,
        )
        .unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn serde_rejects_wrong_width() {
        let err = serde_json::from_str::<Payload>(r#"{"hash":"0xab","proof":"0x","entries":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("length"), "{err}");
    }
}
