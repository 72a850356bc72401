//! Provenance records: where each resolved key got its value from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source name recorded when a lookup fell back to the caller's default.
pub const DEFAULT_SOURCE: &str = "DEFAULT";

/// Source name recorded when a value is injected through the override registry.
pub const REGISTERED_SOURCE: &str = "registered";

/// Key-sorted snapshot of provenance records.
pub type ParameterSources = BTreeMap<String, Provenance>;

/// Last known value of a key and the source that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Last resolved value, rendered as text (`null` when absent).
    pub value: String,

    /// Description of the supplying source.
    pub source: String,

    /// Set when the value was later forced by a registration; `source` then
    /// still names the original origin.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub registered: bool,
}

impl Provenance {
    pub fn new(value: impl Into<String>, source: impl Into<String>) -> Self {
        Provenance {
            value: value.into(),
            source: source.into(),
            registered: false,
        }
    }

    /// Apply a newer observation to this record.
    ///
    /// A registration keeps the original source and only flags it; any other
    /// source replaces the record.
    pub fn update(&mut self, value: impl Into<String>, source: &str) {
        let value = value.into();
        if source == REGISTERED_SOURCE {
            self.value = value;
            if self.source != REGISTERED_SOURCE {
                self.registered = true;
            }
        } else {
            *self = Provenance::new(value, source);
        }
    }

    /// True when the value came from the caller's default.
    pub fn is_default(&self) -> bool {
        self.source == DEFAULT_SOURCE
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value: {}, source: {}", self.value, self.source)?;
        if self.registered {
            write!(f, " (registered)")?;
        }
        Ok(())
    }
}
