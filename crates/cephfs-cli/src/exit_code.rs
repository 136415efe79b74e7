//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments)
pub const USAGE_ERROR: u8 = 2;

/// libcephfs could not be loaded
pub const LIBRARY_UNAVAILABLE: u8 = 3;

/// Permission denied by the cluster
pub const PERMISSION_DENIED: u8 = 5;

/// Mount failed or the session was in the wrong state
pub const MOUNT_FAILED: u8 = 6;

/// File, directory, attribute or option not found
pub const NOT_FOUND: u8 = 7;

/// Target already exists
pub const ALREADY_EXISTS: u8 = 9;
