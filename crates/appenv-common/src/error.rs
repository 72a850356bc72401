//! Error types for appenv.
//!
//! A missing key is never an error: lookups fall back to the caller's default.
//! The variants here cover the cases that must reach the caller:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation hints for humans
//!
//! Errors serialize to structured JSON for the command line front end:
//! ```json
//! {
//!   "code": 10,
//!   "category": "coercion",
//!   "message": "cannot convert value 'abc' of key 'N' to int32",
//!   "context": { "key": "N", "value": "abc", "target": "int32" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::value::ValueKind;

/// Result type alias for appenv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A resolved string could not be converted to the requested type.
    Coercion,
    /// The requested operation is not provided.
    Unsupported,
    /// Malformed input from the command line.
    Usage,
    /// Serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Coercion => write!(f, "coercion"),
            ErrorCategory::Unsupported => write!(f, "unsupported"),
            ErrorCategory::Usage => write!(f, "usage"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for appenv.
#[derive(Error, Debug)]
pub enum Error {
    // Coercion errors (10-19)
    #[error("cannot convert value '{value}' of key '{key}' to {target}")]
    Coercion {
        key: String,
        value: String,
        target: ValueKind,
    },

    #[error("no coercion available for target type {0}")]
    UnsupportedType(ValueKind),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    // Usage errors (20-29)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // I/O errors (30-39)
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Coercion and unsupported operations
    /// - 20-29: Usage errors
    /// - 30-39: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Coercion { .. } => 10,
            Error::UnsupportedType(_) => 11,
            Error::Unsupported(_) => 12,
            Error::InvalidArgument(_) => 20,
            Error::Json(_) => 30,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Coercion { .. } | Error::UnsupportedType(_) => ErrorCategory::Coercion,
            Error::Unsupported(_) => ErrorCategory::Unsupported,
            Error::InvalidArgument(_) => ErrorCategory::Usage,
            Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Coercion { .. } => {
                "Fix the configured value, or remove it so the default applies. Run 'appenv sources <key>' to see where it came from."
            }
            Error::UnsupportedType(_) => {
                "Request the value as one of: bool, int16, int32, int64, decimal, double, datetime, string."
            }
            Error::Unsupported(_) => {
                "Read the values as strings with 'get_string_values' and convert each element."
            }
            Error::InvalidArgument(_) => "Pass assignments as KEY=VALUE.",
            Error::Json(_) => "Internal serialization failure. Retry with '--format human'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Coercion { .. } => "Conversion Error",
            Error::UnsupportedType(_) => "Unsupported Target Type",
            Error::Unsupported(_) => "Unsupported Operation",
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (e.g., key, offending value).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::Coercion { key, value, target } => {
                context.insert("key".to_string(), serde_json::json!(key));
                context.insert("value".to_string(), serde_json::json!(value));
                context.insert("target".to_string(), serde_json::json!(target.to_string()));
            }
            Error::UnsupportedType(kind) => {
                context.insert("target".to_string(), serde_json::json!(kind.to_string()));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
