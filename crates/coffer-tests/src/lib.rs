//! Integration and property test suite for the Coffer wallet.
//!
//! Wallet flows run against the real [`MemoryLedger`](coffer_core::ledger::MemoryLedger)
//! with a deterministic in-memory key store; property tests check that
//! every assembled transaction conserves value.

pub mod helpers;
