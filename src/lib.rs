pub mod chain;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod store;
pub mod verify;

pub use chain::{ChainDigest, GENESIS};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use event::{Event, EventType};
pub use export::HistoryBundle;
pub use store::LedgerStore;
pub use verify::VerificationResult;
