//! Reference value sources.
//!
//! Thin adapters that put a concrete store behind [`ValueSource`]:
//! - [`CommandLineSource`]: `--key=value` style program arguments
//! - [`EnvSource`]: process environment variables
//! - [`MapSource`]: an in-memory map, for defaults layers and tests
//!
//! [`ValueSource`]: crate::ValueSource

pub mod cmdline;
pub mod env;
pub mod map;

pub use cmdline::CommandLineSource;
pub use env::EnvSource;
pub use map::MapSource;
