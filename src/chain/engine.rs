use sha2::{Digest, Sha256};

use crate::chain::digest::ChainDigest;
use crate::event::Event;

/// Compute the digest binding an event to its predecessor.
///
/// The digest is SHA-256 over `prev_hash || canonical_bytes`, in that exact
/// order. Independent verifiers must reproduce this concatenation to
/// re-derive a chain from stored records.
pub fn compute_hash(prev_hash: &ChainDigest, canonical_bytes: &[u8]) -> ChainDigest {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_bytes);
    ChainDigest(hasher.finalize().into())
}

/// Check a single link of a chain.
///
/// The event's stored `prev_hash` must equal `expected_prev`, and its stored
/// `self_hash` must equal the digest recomputed from the event's own fields.
/// Returns false on mismatch rather than an error; a broken link is an
/// expected finding, not a fault.
pub fn verify_link(event: &Event, expected_prev: &ChainDigest) -> bool {
    if event.prev_hash != *expected_prev {
        return false;
    }
    compute_hash(&event.prev_hash, &event.canonical_bytes()) == event.self_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::digest::GENESIS;
    use crate::event::{Event, EventType};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn fixed_time(us: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(us).unwrap()
    }

    fn build_event(sequence: i64, prev_hash: ChainDigest) -> Event {
        let mut event = Event {
            subject_id: Uuid::from_u128(0x1234),
            sequence,
            event_type: EventType::Service,
            payload: b"{\"technician\":\"t-99\"}".to_vec(),
            occurred_at: fixed_time(1_700_000_000_000_000),
            recorded_at: fixed_time(1_700_000_000_500_000),
            prev_hash,
            self_hash: GENESIS,
        };
        event.self_hash = compute_hash(&event.prev_hash, &event.canonical_bytes());
        event
    }

    #[test]
    fn test_compute_hash_is_deterministic() {
        let canonical = b"some canonical bytes";
        let a = compute_hash(&GENESIS, canonical);
        let b = compute_hash(&GENESIS, canonical);
        assert_eq!(a, b);
    }

    #[test]
    fn test_compute_hash_binds_predecessor() {
        let canonical = b"some canonical bytes";
        let from_genesis = compute_hash(&GENESIS, canonical);
        let from_other = compute_hash(&ChainDigest([7u8; 32]), canonical);
        assert_ne!(from_genesis, from_other);
    }

    #[test]
    fn test_compute_hash_binds_content() {
        let a = compute_hash(&GENESIS, b"payload one");
        let b = compute_hash(&GENESIS, b"payload two");
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_link_accepts_intact_event() {
        let event = build_event(1, GENESIS);
        assert!(verify_link(&event, &GENESIS));
    }

    #[test]
    fn test_verify_link_rejects_wrong_predecessor() {
        let event = build_event(1, GENESIS);
        let wrong = ChainDigest([9u8; 32]);
        assert!(!verify_link(&event, &wrong));
    }

    #[test]
    fn test_verify_link_rejects_altered_payload() {
        let mut event = build_event(1, GENESIS);
        event.payload = b"{\"technician\":\"t-00\"}".to_vec();
        assert!(!verify_link(&event, &GENESIS));
    }

    #[test]
    fn test_verify_link_rejects_altered_sequence() {
        let mut event = build_event(3, GENESIS);
        event.sequence = 4;
        assert!(!verify_link(&event, &GENESIS));
    }

    #[test]
    fn test_recorded_at_is_not_hashed() {
        let mut event = build_event(1, GENESIS);
        event.recorded_at = fixed_time(1_800_000_000_000_000);
        assert!(verify_link(&event, &GENESIS));
    }
}
