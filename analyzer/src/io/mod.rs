//! I/O helpers for analyzer commands.

pub mod artifacts;
pub mod config;
pub mod init;
pub mod run_lock;
pub mod sequence_store;
pub mod templates;
pub mod text_buffer;
