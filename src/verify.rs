//! Verification Service
//!
//! Recomputes the hash chain over a subject's full stored history and
//! reports the first point of divergence, if any. A pure read; it never
//! mutates the ledger and may run concurrently with writers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::{self, ChainDigest, GENESIS};
use crate::error::LedgerError;
use crate::event::{canonical_encode, Event};
use crate::store::{EventRow, LedgerStore};

/// Why a chain failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakReason {
    /// A stored self hash does not match the digest recomputed from the
    /// record's own fields: the record was altered in place.
    HashMismatch,
    /// A record's predecessor link or sequence does not follow from the
    /// prior record: a record was removed, reordered, or inserted.
    LinkMismatch,
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakReason::HashMismatch => write!(f, "hash mismatch"),
            BreakReason::LinkMismatch => write!(f, "link mismatch"),
        }
    }
}

/// Outcome of verifying one subject's chain.
///
/// A broken chain is a finding about the data, not an error; storage
/// failures during the walk are the only [`LedgerError`] outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum VerificationResult {
    /// Every link holds from genesis to the tail.
    Valid { events: u64, head: ChainDigest },
    /// The first record whose link fails, and why.
    Broken { at_sequence: i64, reason: BreakReason },
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid { .. })
    }

    /// One-line human-readable verdict.
    pub fn summary(&self) -> String {
        match self {
            VerificationResult::Valid { events, head } => {
                format!("chain intact: {} events, head {}", events, head)
            }
            VerificationResult::Broken {
                at_sequence,
                reason,
            } => {
                format!("chain broken at sequence {}: {}", at_sequence, reason)
            }
        }
    }
}

/// Walk a subject's stored history in order and prove every link.
///
/// Digests are recomputed from the raw stored bytes, so a record tampered
/// into an undecodable state still surfaces as a finding at its own
/// sequence rather than a read error. Rows are fetched in pages of
/// `verify_page_size` to bound memory on long histories.
///
/// An empty ledger verifies as `Valid` with zero events.
pub async fn verify_chain(
    store: &LedgerStore,
    subject_id: Uuid,
) -> Result<VerificationResult, LedgerError> {
    let page_size = store.config().verify_page_size;
    let mut expected_sequence: i64 = 1;
    let mut expected_prev = GENESIS;
    let mut events: u64 = 0;
    // The first page has no lower bound so that rows tampered to a
    // sequence below 1 are still walked.
    let mut from: Option<i64> = None;

    loop {
        let rows = store
            .fetch_rows(subject_id, from, None, Some(page_size))
            .await?;
        if rows.is_empty() {
            break;
        }
        let fetched = rows.len();

        for row in &rows {
            match check_row(&subject_id, row, expected_sequence, &expected_prev) {
                Ok(self_hash) => {
                    expected_prev = self_hash;
                    expected_sequence += 1;
                    events += 1;
                }
                Err((at_sequence, reason)) => {
                    warn!(
                        "Ledger for subject {} broken at sequence {}: {}",
                        subject_id, at_sequence, reason
                    );
                    return Ok(VerificationResult::Broken {
                        at_sequence,
                        reason,
                    });
                }
            }
        }

        if (fetched as u32) < page_size {
            break;
        }
        from = Some(expected_sequence);
    }

    info!(
        "Ledger for subject {} verified: {} events intact",
        subject_id, events
    );
    Ok(VerificationResult::Valid {
        events,
        head: expected_prev,
    })
}

/// Verify an in-memory ordered event list, e.g. one lifted from an exported
/// bundle. The list must start at sequence 1.
pub fn verify_events(events: &[Event]) -> VerificationResult {
    let mut expected_prev = GENESIS;
    let mut expected_sequence: i64 = 1;

    for event in events {
        if event.sequence != expected_sequence {
            return VerificationResult::Broken {
                at_sequence: event.sequence,
                reason: BreakReason::LinkMismatch,
            };
        }
        if chain::compute_hash(&event.prev_hash, &event.canonical_bytes()) != event.self_hash {
            return VerificationResult::Broken {
                at_sequence: event.sequence,
                reason: BreakReason::HashMismatch,
            };
        }
        if event.prev_hash != expected_prev {
            return VerificationResult::Broken {
                at_sequence: event.sequence,
                reason: BreakReason::LinkMismatch,
            };
        }
        expected_prev = event.self_hash;
        expected_sequence += 1;
    }

    VerificationResult::Valid {
        events: events.len() as u64,
        head: expected_prev,
    }
}

/// Check one raw row against the running chain state. Returns the row's
/// stored self hash on success, or the break position and reason.
fn check_row(
    subject_id: &Uuid,
    row: &EventRow,
    expected_sequence: i64,
    expected_prev: &ChainDigest,
) -> Result<ChainDigest, (i64, BreakReason)> {
    if row.sequence != expected_sequence {
        return Err((row.sequence, BreakReason::LinkMismatch));
    }

    // A digest blob of the wrong width cannot match any recomputed value.
    let stored_prev = match ChainDigest::try_from(row.prev_hash.as_slice()) {
        Ok(digest) => digest,
        Err(_) => return Err((row.sequence, BreakReason::HashMismatch)),
    };
    let stored_self = match ChainDigest::try_from(row.self_hash.as_slice()) {
        Ok(digest) => digest,
        Err(_) => return Err((row.sequence, BreakReason::HashMismatch)),
    };

    let canonical = canonical_encode(
        subject_id,
        row.sequence as u64,
        &row.event_type,
        row.occurred_at_us,
        &row.payload,
    );
    if chain::compute_hash(&stored_prev, &canonical) != stored_self {
        return Err((row.sequence, BreakReason::HashMismatch));
    }

    if stored_prev != *expected_prev {
        return Err((row.sequence, BreakReason::LinkMismatch));
    }

    Ok(stored_self)
}
