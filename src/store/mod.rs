//! Ledger Store
//!
//! Durable, append-only persistence of events per subject over SQLite.
//! Insertion order is enforced by a conditional insert that only commits
//! when the chain tail is unchanged; mutation and deletion are blocked by
//! schema triggers.

pub mod schema;

pub(crate) mod rows;
pub(crate) use rows::EventRow;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::{self, GENESIS};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::event::{at_micro_precision, canonical_encode, validate_payload, Event, EventType};

/// Handle to a ledger database. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl LedgerStore {
    /// Open (creating if missing) a file-backed ledger database and bring
    /// its schema up to date.
    pub async fn connect(database_url: &str, config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| LedgerError::Configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool, config };
        store.run_migrations().await?;
        info!("Ledger store ready at {}", database_url);
        Ok(store)
    }

    /// Open an in-memory ledger database, used by tests and tooling.
    pub async fn connect_in_memory(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LedgerError::Configuration(format!("Invalid database URL: {}", e)))?;
        // A single kept-alive connection: every :memory: connection is its
        // own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool, config };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(schema::LEDGER_SCHEMA)
            .execute(&self.pool)
            .await?;
        debug!("Ledger schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Append one event to a subject's ledger.
    ///
    /// Reads the current tail, computes the new event's digest chained to
    /// it, and commits only if the tail is still current. Losing that race
    /// re-reads and retries up to `max_append_attempts` times before
    /// reporting [`LedgerError::ConcurrentAppendConflict`].
    ///
    /// `sequence`, `recorded_at`, `prev_hash`, and `self_hash` are assigned
    /// here and never accepted from the caller.
    pub async fn append(
        &self,
        subject_id: Uuid,
        event_type: EventType,
        payload: Vec<u8>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Event, LedgerError> {
        validate_payload(&payload, self.config.max_payload_bytes)?;
        let occurred_at = at_micro_precision(occurred_at);

        for attempt in 1..=self.config.max_append_attempts {
            let tail = self.latest(subject_id).await?;
            let appended = self
                .append_chained(subject_id, event_type, &payload, occurred_at, tail.as_ref())
                .await?;
            match appended {
                Some(event) => {
                    debug!(
                        "Appended {} event at sequence {} for subject {}",
                        event.event_type, event.sequence, subject_id
                    );
                    return Ok(event);
                }
                None => {
                    warn!(
                        "Ledger tail moved for subject {} (attempt {}), retrying append",
                        subject_id, attempt
                    );
                }
            }
        }

        Err(LedgerError::ConcurrentAppendConflict {
            subject_id,
            attempts: self.config.max_append_attempts,
        })
    }

    /// Insert one event chained to the given tail snapshot.
    ///
    /// Returns `Ok(None)` when the tail is no longer current at commit
    /// time, either because the conditional insert matched zero rows or
    /// because a racing writer claimed the sequence first.
    async fn append_chained(
        &self,
        subject_id: Uuid,
        event_type: EventType,
        payload: &[u8],
        occurred_at: DateTime<Utc>,
        tail: Option<&Event>,
    ) -> Result<Option<Event>, LedgerError> {
        let (sequence, prev_hash) = match tail {
            Some(tail) => (tail.sequence + 1, tail.self_hash),
            None => (1, GENESIS),
        };

        let occurred_at_us = occurred_at.timestamp_micros();
        let recorded_at = at_micro_precision(Utc::now());
        let recorded_at_us = recorded_at.timestamp_micros();

        let canonical = canonical_encode(
            &subject_id,
            sequence as u64,
            event_type.as_str(),
            occurred_at_us,
            payload,
        );
        let self_hash = chain::compute_hash(&prev_hash, &canonical);
        let subject_text = subject_id.to_string();

        // One atomic statement: the row is inserted only if the tail this
        // event was hashed against is still the highest-sequence row. The
        // primary key on (subject_id, sequence) backstops two writers that
        // read the same tail.
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_events
                (subject_id, sequence, event_type, payload,
                 occurred_at_us, recorded_at_us, prev_hash, self_hash)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            WHERE COALESCE(
                (SELECT self_hash FROM ledger_events
                 WHERE subject_id = ?1
                 ORDER BY sequence DESC LIMIT 1),
                ?9
            ) = ?7
            "#,
        )
        .bind(subject_text.as_str())
        .bind(sequence)
        .bind(event_type.as_str())
        .bind(payload)
        .bind(occurred_at_us)
        .bind(recorded_at_us)
        .bind(&prev_hash.as_bytes()[..])
        .bind(&self_hash.as_bytes()[..])
        .bind(&GENESIS.as_bytes()[..])
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(Some(Event {
                subject_id,
                sequence,
                event_type,
                payload: payload.to_vec(),
                occurred_at,
                recorded_at,
                prev_hash,
                self_hash,
            })),
            Ok(_) => Ok(None),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Highest-sequence event for a subject, or `None` for an empty ledger.
    pub async fn latest(&self, subject_id: Uuid) -> Result<Option<Event>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT subject_id, sequence, event_type, payload,
                   occurred_at_us, recorded_at_us, prev_hash, self_hash
            FROM ledger_events
            WHERE subject_id = ?1
            ORDER BY sequence DESC LIMIT 1
            "#,
        )
        .bind(subject_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(EventRow::from_sqlite(&row)?.into_event()?)),
            None => Ok(None),
        }
    }

    /// Events for a subject in ascending sequence order, optionally bounded
    /// to a `[from_sequence, to_sequence]` range for pagination.
    pub async fn list_events(
        &self,
        subject_id: Uuid,
        from_sequence: Option<i64>,
        to_sequence: Option<i64>,
    ) -> Result<Vec<Event>, LedgerError> {
        let rows = self
            .fetch_rows(subject_id, from_sequence, to_sequence, None)
            .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Raw stored rows for a subject, undecoded. Verification walks these.
    pub(crate) async fn fetch_rows(
        &self,
        subject_id: Uuid,
        from_sequence: Option<i64>,
        to_sequence: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<EventRow>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT subject_id, sequence, event_type, payload,
                   occurred_at_us, recorded_at_us, prev_hash, self_hash
            FROM ledger_events
            WHERE subject_id = ?1
              AND (?2 IS NULL OR sequence >= ?2)
              AND (?3 IS NULL OR sequence <= ?3)
            ORDER BY sequence ASC
            LIMIT ?4
            "#,
        )
        .bind(subject_id.to_string())
        .bind(from_sequence)
        .bind(to_sequence)
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(EventRow::from_sqlite)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Number of events recorded for a subject.
    pub async fn event_count(&self, subject_id: Uuid) -> Result<u64, LedgerError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM ledger_events WHERE subject_id = ?1")
            .bind(subject_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    /// Every subject with at least one recorded event.
    pub async fn subjects(&self) -> Result<Vec<Uuid>, LedgerError> {
        let rows = sqlx::query("SELECT DISTINCT subject_id FROM ledger_events ORDER BY subject_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("subject_id")?;
                Uuid::parse_str(&raw).map_err(|e| {
                    LedgerError::corrupt(raw.as_str(), 0, format!("subject id is not a UUID: {}", e))
                })
            })
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
