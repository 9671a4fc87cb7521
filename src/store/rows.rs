use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::chain::ChainDigest;
use crate::error::LedgerError;
use crate::event::{Event, EventType};

/// A ledger row exactly as stored, before any decoding.
///
/// Verification recomputes digests from these raw fields, so a record
/// tampered into an undecodable state is still reported as a chain break at
/// its own sequence rather than as a read failure.
#[derive(Debug, Clone)]
pub(crate) struct EventRow {
    pub subject_id: String,
    pub sequence: i64,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub occurred_at_us: i64,
    pub recorded_at_us: i64,
    pub prev_hash: Vec<u8>,
    pub self_hash: Vec<u8>,
}

impl EventRow {
    pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            subject_id: row.try_get("subject_id")?,
            sequence: row.try_get("sequence")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            occurred_at_us: row.try_get("occurred_at_us")?,
            recorded_at_us: row.try_get("recorded_at_us")?,
            prev_hash: row.try_get("prev_hash")?,
            self_hash: row.try_get("self_hash")?,
        })
    }

    /// Decode the raw row into the public event model.
    pub(crate) fn into_event(self) -> Result<Event, LedgerError> {
        let subject_id = Uuid::parse_str(&self.subject_id).map_err(|e| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                format!("subject id is not a UUID: {}", e),
            )
        })?;
        let event_type: EventType = self.event_type.parse().map_err(|_| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                format!("unknown event type {:?}", self.event_type),
            )
        })?;
        let occurred_at = DateTime::from_timestamp_micros(self.occurred_at_us).ok_or_else(|| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                "occurred_at_us out of range",
            )
        })?;
        let recorded_at = DateTime::from_timestamp_micros(self.recorded_at_us).ok_or_else(|| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                "recorded_at_us out of range",
            )
        })?;
        let prev_hash = ChainDigest::try_from(self.prev_hash.as_slice()).map_err(|e| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                format!("prev_hash: {}", e),
            )
        })?;
        let self_hash = ChainDigest::try_from(self.self_hash.as_slice()).map_err(|e| {
            LedgerError::corrupt(
                self.subject_id.as_str(),
                self.sequence,
                format!("self_hash: {}", e),
            )
        })?;

        Ok(Event {
            subject_id,
            sequence: self.sequence,
            event_type,
            payload: self.payload,
            occurred_at,
            recorded_at,
            prev_hash,
            self_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> EventRow {
        EventRow {
            subject_id: Uuid::from_u128(0x77).to_string(),
            sequence: 4,
            event_type: "INSPECTION".to_string(),
            payload: b"{}".to_vec(),
            occurred_at_us: 1_700_000_000_000_000,
            recorded_at_us: 1_700_000_000_000_500,
            prev_hash: vec![1u8; 32],
            self_hash: vec![2u8; 32],
        }
    }

    #[test]
    fn test_into_event_decodes_clean_row() {
        let event = sample_row().into_event().unwrap();
        assert_eq!(event.sequence, 4);
        assert_eq!(event.event_type, EventType::Inspection);
        assert_eq!(event.prev_hash.as_bytes(), &[1u8; 32]);
        assert_eq!(event.occurred_at.timestamp_micros(), 1_700_000_000_000_000);
    }

    #[test]
    fn test_into_event_rejects_unknown_type() {
        let mut row = sample_row();
        row.event_type = "REPAINT".to_string();
        let err = row.into_event().unwrap_err();
        match err {
            LedgerError::CorruptRecord { sequence, detail, .. } => {
                assert_eq!(sequence, 4);
                assert!(detail.contains("REPAINT"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_into_event_rejects_short_digest() {
        let mut row = sample_row();
        row.self_hash = vec![2u8; 16];
        assert!(matches!(
            row.into_event(),
            Err(LedgerError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_into_event_rejects_bad_subject_id() {
        let mut row = sample_row();
        row.subject_id = "not-a-uuid".to_string();
        assert!(matches!(
            row.into_event(),
            Err(LedgerError::CorruptRecord { .. })
        ));
    }
}
