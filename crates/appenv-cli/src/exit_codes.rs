//! Exit codes for the appenv CLI.
//!
//! Exit codes are a stable contract for scripts:
//! - 0: value resolved (or default applied) and printed
//! - 1: key not found and no default given
//! - 2: usage or conversion error
//! - 3: internal error

use appenv_common::{Error, ErrorCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Clean = 0,

    /// Nothing found and no default supplied.
    NotFound = 1,

    /// Invalid arguments, or a value that does not convert.
    UsageError = 2,

    /// Internal error (bug - please report).
    InternalError = 3,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Coercion | ErrorCategory::Unsupported | ErrorCategory::Usage => {
                ExitCode::UsageError
            }
            ErrorCategory::Io => ExitCode::InternalError,
        }
    }
}
