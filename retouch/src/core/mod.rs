//! Deterministic, pure logic for spotting false-positive changes.
//!
//! Core modules must be free of I/O side effects. They operate on captured
//! command output and injected predicates and return deterministic outputs
//! suitable for tests.

pub mod classifier;
pub mod reconcile;
pub mod report;
pub mod types;
