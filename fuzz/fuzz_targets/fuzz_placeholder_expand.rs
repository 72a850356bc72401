//! Fuzz target for recursive placeholder expansion.
//!
//! Builds a resolver over arbitrary key/value pairs, so values can reference
//! each other in any shape, and checks that every lookup terminates without
//! panicking.

#![no_main]

use std::sync::Arc;

use appenv_config::{MapSource, Resolver};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    pairs: Vec<(String, String)>,
    default: String,
}

fuzz_target!(|input: Input| {
    let source = input
        .pairs
        .iter()
        .take(32)
        .fold(MapSource::new("fuzz"), |source, (k, v)| source.with(k.clone(), v.clone()));
    let resolver = Resolver::new();
    resolver.register_source(Arc::new(source));

    for (key, _) in input.pairs.iter().take(32) {
        let _ = resolver.get_string(key, &input.default);
        let _ = resolver.get_string_values(key, None);
    }

    // Text without placeholders must come back unchanged
    let missing = "\u{0}missing";
    if !input.default.contains('%') && !input.pairs.iter().any(|(k, _)| k == missing) {
        assert_eq!(resolver.get_string(missing, &input.default), input.default);
    }
});
