//! Canonical byte encoding of event fields.
//!
//! The encoding is fixed and version-tagged so that any independent verifier
//! can reproduce stored digests byte for byte. Layout, in order:
//!
//! | field        | encoding                      |
//! |--------------|-------------------------------|
//! | magic        | `0x41 0x4C` ("AL")            |
//! | version      | `0x01`                        |
//! | subject_id   | 16 raw UUID bytes             |
//! | sequence     | u64, big-endian               |
//! | event_type   | u32 BE length, then UTF-8     |
//! | occurred_at  | i64 big-endian, microseconds  |
//! | payload      | u32 BE length, then raw bytes |
//!
//! Variable-length fields carry explicit length prefixes so that no two
//! distinct field combinations concatenate to the same bytes. The
//! predecessor digest is not part of this encoding; it is bound separately
//! by [`crate::chain::compute_hash`].

use uuid::Uuid;

use crate::error::LedgerError;

/// Leading bytes of every canonical encoding.
pub const CANONICAL_MAGIC: [u8; 2] = [0x41, 0x4C];

/// Current canonical encoding version.
pub const CANONICAL_VERSION: u8 = 0x01;

/// Encode event fields into their canonical hashing representation.
pub fn canonical_encode(
    subject_id: &Uuid,
    sequence: u64,
    event_type: &str,
    occurred_at_us: i64,
    payload: &[u8],
) -> Vec<u8> {
    let type_bytes = event_type.as_bytes();
    let mut buf = Vec::with_capacity(43 + type_bytes.len() + payload.len());

    buf.extend_from_slice(&CANONICAL_MAGIC);
    buf.push(CANONICAL_VERSION);
    buf.extend_from_slice(subject_id.as_bytes());
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(&(type_bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(type_bytes);
    buf.extend_from_slice(&occurred_at_us.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);

    buf
}

/// Reject payloads above the configured ceiling before anything is hashed
/// or written.
pub fn validate_payload(payload: &[u8], max_bytes: usize) -> Result<(), LedgerError> {
    if payload.len() > max_bytes {
        return Err(LedgerError::PayloadTooLarge {
            size: payload.len(),
            max: max_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn subject() -> Uuid {
        Uuid::from_u128(0xDEAD_BEEF)
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = canonical_encode(&subject(), 7, "SERVICE", 1_700_000_000_000_000, b"notes");
        let b = canonical_encode(&subject(), 7, "SERVICE", 1_700_000_000_000_000, b"notes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_payloads_encode_deterministically() {
        let mut payload = vec![0u8; 4096];
        rand::thread_rng().fill_bytes(&mut payload);
        let a = canonical_encode(&subject(), 1, "OTHER", 0, &payload);
        let b = canonical_encode(&subject(), 1, "OTHER", 0, &payload);
        assert_eq!(a, b);
    }

    #[test]
    fn test_header_layout() {
        let encoded = canonical_encode(&subject(), 5, "CLAIM", 42, b"xy");
        assert_eq!(&encoded[0..2], &[0x41, 0x4C]);
        assert_eq!(encoded[2], 0x01);
        assert_eq!(&encoded[3..19], subject().as_bytes());
        assert_eq!(&encoded[19..27], &5u64.to_be_bytes());
        assert_eq!(encoded.len(), 43 + "CLAIM".len() + 2);
    }

    #[test]
    fn test_length_prefixes_prevent_boundary_ambiguity() {
        // Moving a byte across the type/payload boundary must change the
        // encoding even though the concatenated content is identical.
        let a = canonical_encode(&subject(), 1, "AB", 0, b"C");
        let b = canonical_encode(&subject(), 1, "A", 0, b"BC");
        assert_ne!(a, b);
    }

    #[test]
    fn test_each_field_changes_encoding() {
        let base = canonical_encode(&subject(), 1, "INSTALL", 100, b"p");
        let other_subject = Uuid::from_u128(0xFEED);
        assert_ne!(
            base,
            canonical_encode(&other_subject, 1, "INSTALL", 100, b"p")
        );
        assert_ne!(base, canonical_encode(&subject(), 2, "INSTALL", 100, b"p"));
        assert_ne!(base, canonical_encode(&subject(), 1, "SERVICE", 100, b"p"));
        assert_ne!(base, canonical_encode(&subject(), 1, "INSTALL", 101, b"p"));
        assert_ne!(base, canonical_encode(&subject(), 1, "INSTALL", 100, b"q"));
    }

    #[test]
    fn test_negative_timestamps_encode() {
        // Pre-1970 occurrence times are legal for imported histories.
        let encoded = canonical_encode(&subject(), 1, "OTHER", -1_000_000, b"");
        assert_eq!(encoded.len(), 43 + "OTHER".len());
    }

    #[test]
    fn test_validate_payload_at_limit() {
        let payload = vec![0u8; 64];
        assert!(validate_payload(&payload, 64).is_ok());
        assert!(validate_payload(&payload, 63).is_err());
    }

    #[test]
    fn test_validate_payload_reports_sizes() {
        let err = validate_payload(&[0u8; 10], 5).unwrap_err();
        match err {
            LedgerError::PayloadTooLarge { size, max } => {
                assert_eq!(size, 10);
                assert_eq!(max, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload_is_valid() {
        assert!(validate_payload(b"", 64).is_ok());
        let encoded = canonical_encode(&subject(), 1, "OTHER", 0, b"");
        assert_eq!(&encoded[encoded.len() - 4..], &0u32.to_be_bytes());
    }
}
