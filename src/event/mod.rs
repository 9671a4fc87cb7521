//! Event Record Model
//!
//! The canonical immutable unit of history: one append to a subject's
//! ledger, together with its deterministic byte encoding for hashing.

pub mod canonical;
pub mod types;

pub use canonical::{canonical_encode, validate_payload, CANONICAL_MAGIC, CANONICAL_VERSION};
pub use types::EventType;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chain::ChainDigest;

/// One append to a subject's ledger.
///
/// `sequence`, `recorded_at`, `prev_hash`, and `self_hash` are assigned by
/// the store at write time; callers supply only the subject, type, payload,
/// and occurrence time through [`crate::store::LedgerStore::append`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub subject_id: Uuid,
    pub sequence: i64,
    pub event_type: EventType,
    /// Opaque domain content, hashed as bytes and never interpreted here.
    #[serde(with = "payload_encoding")]
    pub payload: Vec<u8>,
    /// When the real-world action happened, per the caller.
    pub occurred_at: DateTime<Utc>,
    /// When the event was durably appended. Not covered by the hash.
    pub recorded_at: DateTime<Utc>,
    pub prev_hash: ChainDigest,
    pub self_hash: ChainDigest,
}

impl Event {
    /// Canonical byte representation of this event's hashed fields.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_encode(
            &self.subject_id,
            self.sequence as u64,
            self.event_type.as_str(),
            self.occurred_at.timestamp_micros(),
            &self.payload,
        )
    }
}

/// Truncate a timestamp to whole microseconds, the precision at which
/// timestamps are hashed and stored.
pub fn at_micro_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

/// Hex (de)serialization for opaque payload bytes in JSON output.
mod payload_encoding {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
