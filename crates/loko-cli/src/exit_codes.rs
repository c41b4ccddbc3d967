//! Standard exit codes for CLI operations

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - configuration decoding or validation failed
pub const VALIDATION_ERROR: i32 = 2;

/// Render error - a component failed to produce its manifests
pub const RENDER_ERROR: i32 = 3;

/// Unknown component - a configured name is not registered
pub const UNKNOWN_COMPONENT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
