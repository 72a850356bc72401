//! appenv configuration value resolution.
//!
//! This crate provides:
//! - The [`ValueSource`] contract every configuration origin implements
//! - A shared [`OverrideRegistry`] for injected values and provenance
//! - `%name%` placeholder expansion with cycle protection
//! - The [`Resolver`], which walks an ordered source chain and records
//!   where each value came from
//! - Reference sources for command line arguments, environment variables
//!   and in-memory maps
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use appenv_config::{MapSource, Resolver, SharedSource};
//!
//! let resolver = Resolver::new();
//! let settings: SharedSource = Arc::new(
//!     MapSource::new("settings")
//!         .with("Home", "/srv/app")
//!         .with("LogDir", "%Home%/log"),
//! );
//! resolver.register_source(settings);
//!
//! assert_eq!(resolver.get_string("LogDir", "/tmp"), "/srv/app/log");
//! assert_eq!(resolver.get_value("Retries", 3).unwrap(), 3);
//! assert!(resolver.is_default("Retries"));
//! ```

pub mod placeholder;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod sources;

pub use registry::{OverrideRegistry, OverrideValue};
pub use resolver::{Resolver, SourceChain};
pub use source::{same_source, SharedSource, ValueSource};
pub use sources::{CommandLineSource, EnvSource, MapSource};

pub use appenv_common::{
    Error, ParameterSources, Provenance, Result, TypedValue, ValueKind, DEFAULT_SOURCE,
    REGISTERED_SOURCE,
};
