//! In-memory value source.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::source::ValueSource;

/// Values held in memory. Keys may carry several values.
///
/// The map can be changed after the source is registered; lookups see the
/// change immediately.
#[derive(Debug)]
pub struct MapSource {
    description: String,
    values: RwLock<HashMap<String, Vec<String>>>,
}

impl MapSource {
    pub fn new(description: impl Into<String>) -> Self {
        MapSource {
            description: description.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Builder form of [`insert`](MapSource::insert).
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of [`insert_many`](MapSource::insert_many).
    pub fn with_many<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.insert_many(key, values);
        self
    }

    /// Set a single value, replacing any previous values of the key.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), vec![value.into()]);
    }

    /// Set all values of a key. An empty sequence removes the key.
    pub fn insert_many<I, V>(&self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let mut map = self.values.write();
        if values.is_empty() {
            map.remove(&key);
        } else {
            map.insert(key, values);
        }
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MapSource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let source = MapSource::new("memory");
        for (key, value) in iter {
            source.insert(key, value);
        }
        source
    }
}

impl ValueSource for MapSource {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn resolve_one(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .get(key)
            .and_then(|values| values.first().cloned())
    }

    fn resolve_many(&self, key: &str) -> Option<Vec<String>> {
        self.values.read().get(key).cloned()
    }
}
