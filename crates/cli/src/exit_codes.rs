//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | Usage error (bad args, bad settings)     |
//! | 3-9     | merge            | Master file and merge artifact codes     |
//! | 10-19   | collect          | Lookup source and search codes           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use leadbase_collect::LookupError;
use leadbase_io::MergeError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable or invalid settings file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (3-9)
// =============================================================================

/// Master file does not exist.
pub const EXIT_MERGE_MASTER_NOT_FOUND: u8 = 3;

/// Another merge holds `<master>.lock`.
pub const EXIT_MERGE_LOCKED: u8 = 4;

/// Master or records file could not be read (or is not a dataset format).
pub const EXIT_MERGE_READ: u8 = 5;

/// Merged artifact could not be written. Master untouched.
pub const EXIT_MERGE_WRITE: u8 = 6;

/// Merged artifact written, but the master could not be renamed to its
/// `- original` name. Both files exist; resolve by hand.
pub const EXIT_MERGE_PRESERVE: u8 = 7;

/// Output directory is the master's own directory.
pub const EXIT_MERGE_OUTPUT_IS_INPUT: u8 = 8;

// =============================================================================
// Collect (10-19)
// =============================================================================

/// Lookup API key not set (neither environment nor `.env`).
pub const EXIT_COLLECT_MISSING_KEY: u8 = 10;

/// Lookup client could not be created.
pub const EXIT_COLLECT_CLIENT: u8 = 11;

/// Every search attempt failed (network, auth, or upstream errors).
pub const EXIT_COLLECT_FAILED: u8 = 12;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a MergeError to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::MasterNotFound(_) => EXIT_MERGE_MASTER_NOT_FOUND,
        MergeError::Locked(_) => EXIT_MERGE_LOCKED,
        MergeError::UnsupportedFormat(_) | MergeError::Read { .. } => EXIT_MERGE_READ,
        MergeError::Write { .. } => EXIT_MERGE_WRITE,
        MergeError::Preserve { .. } => EXIT_MERGE_PRESERVE,
        MergeError::OutputIsInput(_) => EXIT_MERGE_OUTPUT_IS_INPUT,
    }
}

/// Map a LookupError to its exit code.
pub fn lookup_exit_code(err: &LookupError) -> u8 {
    match err {
        LookupError::MissingApiKey => EXIT_COLLECT_MISSING_KEY,
        _ => EXIT_COLLECT_CLIENT,
    }
}
