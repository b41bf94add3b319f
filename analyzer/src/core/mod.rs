//! Deterministic, pure logic shared by the analyzer commands.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod descriptor;
pub mod formatter;
pub mod invariants;
pub mod markers;
pub mod sequence;
pub mod skeleton;
pub mod tree_log;
pub mod types;
