use serde::{Deserialize, Serialize};
use std::env;

use crate::error::LedgerError;

/// Default ceiling on event payload size (64 KiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Default number of append attempts before reporting a conflict.
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 3;

/// Default number of rows fetched per page during verification.
pub const DEFAULT_VERIFY_PAGE_SIZE: u32 = 256;

/// Tunable limits for the ledger engine.
///
/// All fields have conservative defaults; deployments override them through
/// environment variables (`LEDGER_MAX_PAYLOAD_BYTES`,
/// `LEDGER_MAX_APPEND_ATTEMPTS`, `LEDGER_VERIFY_PAGE_SIZE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum accepted payload size in bytes. Larger payloads are rejected
    /// before anything is hashed or written.
    pub max_payload_bytes: usize,
    /// How many times an append re-reads the chain tail and retries after
    /// losing a race to a concurrent writer.
    pub max_append_attempts: u32,
    /// Rows per page when walking a chain during verification. Bounds memory
    /// for arbitrarily long histories.
    pub verify_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
            verify_page_size: DEFAULT_VERIFY_PAGE_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, LedgerError> {
        let max_payload_bytes = read_env("LEDGER_MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES)?;
        let max_append_attempts =
            read_env("LEDGER_MAX_APPEND_ATTEMPTS", DEFAULT_MAX_APPEND_ATTEMPTS)?;
        let verify_page_size = read_env("LEDGER_VERIFY_PAGE_SIZE", DEFAULT_VERIFY_PAGE_SIZE)?;

        let config = Self {
            max_payload_bytes,
            max_append_attempts,
            verify_page_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the engine inoperable.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_payload_bytes == 0 {
            return Err(LedgerError::Configuration(
                "max_payload_bytes must be at least 1".to_string(),
            ));
        }
        if self.max_payload_bytes > u32::MAX as usize {
            return Err(LedgerError::Configuration(format!(
                "max_payload_bytes ({}) exceeds the canonical length prefix range",
                self.max_payload_bytes
            )));
        }
        if self.max_append_attempts == 0 {
            return Err(LedgerError::Configuration(
                "max_append_attempts must be at least 1".to_string(),
            ));
        }
        if self.verify_page_size == 0 {
            return Err(LedgerError::Configuration(
                "verify_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, LedgerError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e| {
            LedgerError::Configuration(format!("Failed to parse {}={:?}: {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
