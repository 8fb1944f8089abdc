//! Stable exit codes for retouch CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config or other errors.
pub const INVALID: i32 = 1;
/// `retouch check` could not restore at least one file.
pub const REPAIR_FAILED: i32 = 2;
