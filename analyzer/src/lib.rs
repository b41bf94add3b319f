//! Pass-sequence editing and engine-output decoding for a rule-engine analyzer.
//!
//! An analyzer directory holds a pass descriptor (`spec/analyzer.seq`), the
//! rule files it names, and per-input engine output. The crate keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (descriptor parsing, sequence
//!   edits, marker decoding, rule synthesis). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (descriptor store, artifact files,
//!   config, run lock).
//!
//! Orchestration modules ([`passes`], [`decode`], [`validate`]) coordinate
//! core logic with I/O to implement CLI commands.

pub mod core;
pub mod decode;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pass;
pub mod passes;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
