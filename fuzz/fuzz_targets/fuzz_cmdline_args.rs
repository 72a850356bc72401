//! Fuzz target for command line argument parsing.
//!
//! Tests that `CommandLineSource::from_args` accepts any argument list and
//! that every parsed key resolves to its last value.

#![no_main]

use appenv_config::{CommandLineSource, ValueSource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|args: Vec<String>| {
    let source = CommandLineSource::from_args(&args);
    assert!(source.len() + source.positional().len() == args.len());
    for arg in &args {
        let key = arg.trim_start_matches(['-', '/']);
        if let (Some(one), Some(many)) = (source.resolve_one(key), source.resolve_many(key)) {
            assert_eq!(many.last(), Some(&one));
        }
    }
});
