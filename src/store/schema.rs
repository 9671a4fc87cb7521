// Database schema definitions and migrations
// This module contains the SQL schema for the ledger store

pub const LEDGER_SCHEMA: &str = include_str!("../../migrations/001_ledger_events.sql");
