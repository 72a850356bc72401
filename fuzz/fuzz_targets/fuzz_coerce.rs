//! Fuzz target for scalar coercion.
//!
//! Every kind must either reject the input or produce a value of that kind.

#![no_main]

use appenv_common::{coerce, ValueKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        for kind in ValueKind::ALL {
            if let Some(value) = coerce(kind, text) {
                assert_eq!(value.kind(), kind);
            }
        }
    }
});
