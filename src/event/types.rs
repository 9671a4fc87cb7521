use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Closed set of lifecycle actions a ledger records.
///
/// The wire name (`as_str`) is part of the canonical encoding; renaming a
/// variant would break every previously computed digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Install,
    Service,
    Inspection,
    Transfer,
    DocumentAttached,
    WarrantyRegistered,
    Claim,
    Other,
}

impl EventType {
    /// All accepted types, in declaration order.
    pub const ALL: [EventType; 8] = [
        EventType::Install,
        EventType::Service,
        EventType::Inspection,
        EventType::Transfer,
        EventType::DocumentAttached,
        EventType::WarrantyRegistered,
        EventType::Claim,
        EventType::Other,
    ];

    /// Stable name used in canonical bytes and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Install => "INSTALL",
            EventType::Service => "SERVICE",
            EventType::Inspection => "INSPECTION",
            EventType::Transfer => "TRANSFER",
            EventType::DocumentAttached => "DOCUMENT_ATTACHED",
            EventType::WarrantyRegistered => "WARRANTY_REGISTERED",
            EventType::Claim => "CLAIM",
            EventType::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSTALL" => Ok(EventType::Install),
            "SERVICE" => Ok(EventType::Service),
            "INSPECTION" => Ok(EventType::Inspection),
            "TRANSFER" => Ok(EventType::Transfer),
            "DOCUMENT_ATTACHED" => Ok(EventType::DocumentAttached),
            "WARRANTY_REGISTERED" => Ok(EventType::WarrantyRegistered),
            "CLAIM" => Ok(EventType::Claim),
            "OTHER" => Ok(EventType::Other),
            other => Err(LedgerError::InvalidEventType(other.to_string())),
        }
    }
}
