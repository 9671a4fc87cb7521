#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use asset_ledger::event::EventType;
use asset_ledger::{Event, LedgerConfig, LedgerError, LedgerStore};

/// Setup an in-memory ledger store for testing
pub async fn setup_test_store() -> LedgerStore {
    LedgerStore::connect_in_memory(LedgerConfig::default())
        .await
        .expect("Failed to create test store")
}

/// Setup an in-memory ledger store with custom limits
pub async fn setup_test_store_with(config: LedgerConfig) -> LedgerStore {
    LedgerStore::connect_in_memory(config)
        .await
        .expect("Failed to create test store")
}

/// Setup a file-backed store in a fresh temp directory.
///
/// The TempDir guard must stay alive for the duration of the test.
pub async fn setup_file_store() -> (TempDir, String, LedgerStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let store = LedgerStore::connect(&url, LedgerConfig::default())
        .await
        .expect("Failed to open file-backed test store");
    (dir, url, store)
}

/// Timestamp a given number of days in the past
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Small JSON payload fixture
pub fn payload(note: &str) -> Vec<u8> {
    serde_json::json!({ "note": note }).to_string().into_bytes()
}

/// Append with caller-side retries, the documented recovery for
/// `ConcurrentAppendConflict` under heavy contention.
pub async fn append_with_retry(
    store: &LedgerStore,
    subject: Uuid,
    event_type: EventType,
    payload: Vec<u8>,
    occurred_at: DateTime<Utc>,
) -> Event {
    for _ in 0..50 {
        match store
            .append(subject, event_type, payload.clone(), occurred_at)
            .await
        {
            Ok(event) => return event,
            Err(LedgerError::ConcurrentAppendConflict { .. }) => continue,
            Err(other) => panic!("append failed: {:?}", other),
        }
    }
    panic!("append did not succeed after 50 attempts");
}

/// Record a short install/service/inspection history for a subject
pub async fn seed_history(store: &LedgerStore, subject: Uuid) -> Vec<Event> {
    let mut events = Vec::new();
    events.push(
        store
            .append(subject, EventType::Install, payload("installed"), days_ago(120))
            .await
            .expect("seed install"),
    );
    events.push(
        store
            .append(subject, EventType::Service, payload("serviced"), days_ago(30))
            .await
            .expect("seed service"),
    );
    events.push(
        store
            .append(
                subject,
                EventType::Inspection,
                payload("inspected"),
                days_ago(29),
            )
            .await
            .expect("seed inspection"),
    );
    events
}
