//! CLI Exit Code Registry
//!
//! Every exit code `sgrid` can return is defined here. Scripts rely on them.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad arguments, unknown variable set) |
//! | 3    | Dataset file could not be read or written         |
//! | 4    | The compute module rejected the analysis          |
//! | 5    | The request timed out, was cancelled or was lost  |
//! | 6    | The result could not be mapped or recorded        |

use statgrid_analysis::AnalysisError;

pub const EXIT_SUCCESS: u8 = 0;

/// Avoid; prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

pub const EXIT_USAGE: u8 = 2;

/// Import, load, save or export failed.
pub const EXIT_IO: u8 = 3;

/// The module answered `{success: false}`, e.g. a string variable passed
/// to descriptives.
pub const EXIT_COMPUTE: u8 = 4;

/// Timeout, cancellation or a closed channel.
pub const EXIT_TRANSPORT: u8 = 5;

/// Malformed result table or audit write failure. Nothing was recorded.
pub const EXIT_RECORD: u8 = 6;

pub fn analysis_exit_code(err: &AnalysisError) -> u8 {
    match err {
        AnalysisError::Compute(_) => EXIT_COMPUTE,
        AnalysisError::Transport(_) => EXIT_TRANSPORT,
        AnalysisError::Mapping(_) | AnalysisError::Audit(_) => EXIT_RECORD,
    }
}
