//! Override registry shared by all resolvers of an application.
//!
//! Holds two maps:
//! - explicitly injected key/value overrides, consulted before any source
//! - the provenance log: last value and supplying source per resolved key
//!
//! Both maps are sharded concurrent maps, so single-key operations need no
//! external locking. Provenance writers share a read guard on
//! `snapshot_lock`; [`OverrideRegistry::parameters_sources`] takes it
//! exclusively, which makes the sorted copy it returns consistent.

use appenv_common::{Decimal, ParameterSources, Provenance, TypedValue};
use chrono::NaiveDateTime;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;

/// Text recorded for a missing value.
pub(crate) const NULL_TEXT: &str = "null";

/// A value injected into the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    /// Registered without a value. Lookups of the key fall back to the
    /// caller's default and do not consult the sources.
    Null,
    Scalar(TypedValue),
}

impl OverrideValue {
    /// Text form used for resolution, `None` for [`OverrideValue::Null`].
    pub fn as_text(&self) -> Option<String> {
        match self {
            OverrideValue::Null => None,
            OverrideValue::Scalar(value) => Some(value.to_string()),
        }
    }
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideValue::Null => f.write_str(NULL_TEXT),
            OverrideValue::Scalar(value) => write!(f, "{}", value),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for OverrideValue {
                fn from(value: $ty) -> Self {
                    OverrideValue::Scalar(TypedValue::$variant(value.into()))
                }
            }
        )*
    };
}

impl_from_scalar!(
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    Decimal => Decimal,
    f64 => Double,
    NaiveDateTime => DateTime,
    String => String,
    &str => String,
);

impl From<TypedValue> for OverrideValue {
    fn from(value: TypedValue) -> Self {
        OverrideValue::Scalar(value)
    }
}

impl<T: Into<OverrideValue>> From<Option<T>> for OverrideValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(OverrideValue::Null, Into::into)
    }
}

/// Injected overrides plus the provenance log.
#[derive(Debug, Default)]
pub struct OverrideRegistry {
    values: DashMap<String, OverrideValue>,
    sources: DashMap<String, Provenance>,
    snapshot_lock: RwLock<()>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an override, replacing any previous one for the key.
    pub fn register_key_value(&self, key: impl Into<String>, value: impl Into<OverrideValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove an override. No-op when the key is not registered.
    pub fn unregister_key(&self, key: &str) {
        self.values.remove(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_value(&self, key: &str) -> Option<OverrideValue> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    /// Number of registered overrides.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Record the value a key resolved to and where it came from.
    ///
    /// Ignored when `key` or `source` is empty. Recording under
    /// [`REGISTERED_SOURCE`](appenv_common::REGISTERED_SOURCE) keeps the
    /// original source of an existing entry and flags it as registered.
    pub fn remember_parameter_source(&self, key: &str, source: &str, value: &str) {
        if key.is_empty() || source.is_empty() {
            return;
        }
        let _shared = self.snapshot_lock.read();
        match self.sources.entry(key.to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().update(value, source),
            Entry::Vacant(entry) => {
                entry.insert(Provenance::new(value, source));
            }
        }
    }

    /// Provenance of a single key.
    pub fn provenance(&self, key: &str) -> Option<Provenance> {
        self.sources.get(key).map(|entry| entry.value().clone())
    }

    /// Key-sorted copy of the provenance log.
    pub fn parameters_sources(&self) -> ParameterSources {
        let _exclusive = self.snapshot_lock.write();
        self.sources
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appenv_common::{DEFAULT_SOURCE, REGISTERED_SOURCE};

    #[test]
    fn test_register_replaces_previous_value() {
        let registry = OverrideRegistry::new();
        registry.register_key_value("K", "v1");
        registry.register_key_value("K", 7);
        assert!(registry.contains_key("K"));
        assert_eq!(registry.get_value("K"), Some(OverrideValue::from(7)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_noop_for_unknown_key() {
        let registry = OverrideRegistry::new();
        registry.unregister_key("missing");
        registry.register_key_value("K", true);
        registry.unregister_key("K");
        assert!(!registry.contains_key("K"));
        assert!(registry.get_value("K").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_override_value_text() {
        assert_eq!(OverrideValue::from("x").as_text().as_deref(), Some("x"));
        assert_eq!(OverrideValue::from(false).as_text().as_deref(), Some("false"));
        assert_eq!(OverrideValue::from(None::<i32>), OverrideValue::Null);
        assert_eq!(OverrideValue::Null.as_text(), None);
        assert_eq!(OverrideValue::Null.to_string(), "null");
    }

    #[test]
    fn test_remember_ignores_empty_key_or_source() {
        let registry = OverrideRegistry::new();
        registry.remember_parameter_source("", "env", "v");
        registry.remember_parameter_source("K", "", "v");
        assert!(registry.parameters_sources().is_empty());
    }

    #[test]
    fn test_registration_preserves_original_source() {
        let registry = OverrideRegistry::new();
        registry.remember_parameter_source("K", "settings.ini", "v0");
        registry.remember_parameter_source("K", REGISTERED_SOURCE, "v1");
        registry.remember_parameter_source("K", REGISTERED_SOURCE, "v2");

        let record = registry.provenance("K").unwrap();
        assert_eq!(record.value, "v2");
        assert_eq!(record.source, "settings.ini");
        assert!(record.registered);
    }

    #[test]
    fn test_parameters_sources_is_sorted_copy() {
        let registry = OverrideRegistry::new();
        registry.remember_parameter_source("b", "env", "2");
        registry.remember_parameter_source("a", DEFAULT_SOURCE, "1");
        let snapshot = registry.parameters_sources();
        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);

        registry.remember_parameter_source("c", "env", "3");
        assert_eq!(snapshot.len(), 2);
    }
}
