//! Hash-Chain Engine
//!
//! Computes and verifies the cryptographic linkage between consecutive
//! events of a subject's ledger.

pub mod digest;
pub mod engine;

pub use digest::{ChainDigest, DigestParseError, GENESIS};
pub use engine::{compute_hash, verify_link};
