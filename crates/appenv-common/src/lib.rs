//! appenv common types.
//!
//! This crate provides the types shared by the resolution engine and its
//! front ends:
//! - The unified error type with stable codes
//! - Provenance records for resolved keys
//! - The closed scalar value model and string coercion

pub mod error;
pub mod provenance;
pub mod value;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use provenance::{ParameterSources, Provenance, DEFAULT_SOURCE, REGISTERED_SOURCE};
pub use value::{coerce, ConfigScalar, Decimal, TypedValue, ValueKind};
