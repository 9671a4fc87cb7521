use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 digest linking one ledger event to its predecessor.
///
/// Stored as raw bytes, rendered as lowercase hex everywhere a human or a
/// JSON consumer sees it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainDigest(pub [u8; 32]);

/// Sentinel predecessor for the first event of every subject.
pub const GENESIS: ChainDigest = ChainDigest([0u8; 32]);

impl ChainDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_genesis(&self) -> bool {
        *self == GENESIS
    }
}

impl fmt::Display for ChainDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChainDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainDigest({})", self.to_hex())
    }
}

/// Error for digests that are not exactly 32 bytes of valid hex.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain digest: {0}")]
pub struct DigestParseError(pub String);

impl FromStr for ChainDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|e| DigestParseError(e.to_string()))?;
        ChainDigest::try_from(raw.as_slice())
    }
}

impl TryFrom<&[u8]> for ChainDigest {
    type Error = DigestParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DigestParseError(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(ChainDigest(arr))
    }
}

impl From<[u8; 32]> for ChainDigest {
    fn from(bytes: [u8; 32]) -> Self {
        ChainDigest(bytes)
    }
}

impl Serialize for ChainDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
