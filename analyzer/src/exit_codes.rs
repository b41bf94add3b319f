//! Stable exit codes for analyzer CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid layout/config/descriptor, or any other error.
pub const INVALID: i32 = 1;
/// A structural edit was refused; the descriptor is unchanged.
pub const REFUSED: i32 = 2;
/// The addressed pass does not exist.
pub const NOT_FOUND: i32 = 3;
/// The engine has not produced the requested output yet.
pub const NO_OUTPUT: i32 = 4;
