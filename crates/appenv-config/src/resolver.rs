//! The resolver: ordered source chain with placeholder expansion.
//!
//! Lookup order for a key:
//! 1. The shared override registry
//! 2. Registered sources, in registration order (first hit wins)
//! 3. The caller's default
//!
//! Resolved values have their `%name%` placeholders expanded through the same
//! lookup path, recursively. Every top-level lookup records its outcome in
//! the registry's provenance log.
//!
//! The source chain is copy-on-write. Writers serialize on `write_lock`,
//! build a new [`SourceChain`] and publish it atomically; a lookup works on
//! the snapshot that was current when it started and never holds a lock
//! while calling into a source.

use std::sync::Arc;

use appenv_common::{
    coerce, ConfigScalar, Error, ParameterSources, Result, TypedValue, ValueKind, DEFAULT_SOURCE,
    REGISTERED_SOURCE,
};
use arc_swap::ArcSwap;
use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::placeholder::{self, ExpansionChain};
use crate::registry::{OverrideRegistry, OverrideValue, NULL_TEXT};
use crate::source::{same_source, SharedSource, ValueSource};

/// Description of a resolver without sources.
const RESOLVER_NAME: &str = "appenv";

/// Immutable, ordered snapshot of a resolver's sources.
#[derive(Clone)]
pub struct SourceChain {
    sources: Vec<SharedSource>,
    description: String,
}

impl SourceChain {
    fn new(sources: Vec<SharedSource>) -> Self {
        let description = if sources.is_empty() {
            RESOLVER_NAME.to_string()
        } else {
            let names: Vec<String> = sources.iter().map(|s| s.description()).collect();
            format!("{}: {}", RESOLVER_NAME, names.join(", "))
        };
        SourceChain {
            sources,
            description,
        }
    }

    /// Sources, highest priority first.
    pub fn sources(&self) -> &[SharedSource] {
        &self.sources
    }

    /// Aggregate description of the whole chain.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn position(&self, source: &SharedSource) -> Option<usize> {
        self.sources.iter().position(|s| same_source(s, source))
    }

    pub fn contains(&self, source: &SharedSource) -> bool {
        self.position(source).is_some()
    }
}

impl std::fmt::Debug for SourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("description", &self.description)
            .field("len", &self.sources.len())
            .finish()
    }
}

/// A resolved raw value and the name of whatever supplied it.
struct Hit {
    value: String,
    source: String,
}

/// Configuration lookup front end.
pub struct Resolver {
    registry: Arc<OverrideRegistry>,
    chain: ArcSwap<SourceChain>,
    write_lock: Mutex<()>,
    defaulted: DashSet<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("chain", &*self.chain.load())
            .field("overrides", &self.registry.len())
            .finish()
    }
}

impl Resolver {
    /// Create a resolver with its own, unshared override registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(OverrideRegistry::new()))
    }

    /// Create a resolver on a registry shared with other resolvers.
    pub fn with_registry(registry: Arc<OverrideRegistry>) -> Self {
        Resolver {
            registry,
            chain: ArcSwap::from_pointee(SourceChain::new(Vec::new())),
            write_lock: Mutex::new(()),
            defaulted: DashSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<OverrideRegistry> {
        &self.registry
    }

    /// Current snapshot of the source chain.
    pub fn sources(&self) -> Arc<SourceChain> {
        self.chain.load_full()
    }

    /// Aggregate description of the current chain.
    pub fn description(&self) -> String {
        self.chain.load().description.clone()
    }

    // ------------------------------------------------------------------
    // Source chain mutation
    // ------------------------------------------------------------------

    /// Append `source` (lowest priority). An existing registration of the
    /// same source is moved.
    pub fn register_source(&self, source: SharedSource) {
        self.mutate_chain("append", |sources| {
            remove_source(sources, &source);
            sources.push(source);
        });
    }

    /// Insert `source` right before `anchor`, or at the front when `anchor`
    /// is not registered.
    pub fn register_source_before(&self, source: SharedSource, anchor: &SharedSource) {
        self.mutate_chain("insert_before", |sources| {
            remove_source(sources, &source);
            let index = sources
                .iter()
                .position(|s| same_source(s, anchor))
                .unwrap_or(0);
            sources.insert(index, source);
        });
    }

    /// Insert `source` at `index`, appending when the index is past the end.
    pub fn register_source_at(&self, source: SharedSource, index: usize) {
        self.mutate_chain("insert_at", |sources| {
            remove_source(sources, &source);
            if index < sources.len() {
                sources.insert(index, source);
            } else {
                sources.push(source);
            }
        });
    }

    /// Remove `source`. No-op when it is not registered.
    pub fn unregister_source(&self, source: &SharedSource) {
        self.mutate_chain("remove", |sources| {
            remove_source(sources, source);
        });
    }

    fn mutate_chain(&self, op: &'static str, edit: impl FnOnce(&mut Vec<SharedSource>)) {
        let _writer = self.write_lock.lock();
        let mut sources = self.chain.load().sources.clone();
        edit(&mut sources);
        let next = SourceChain::new(sources);
        debug!(
            target: "appenv_config::resolver",
            op,
            len = next.len(),
            chain = %next.description,
            "source chain updated"
        );
        self.chain.store(Arc::new(next));
    }

    // ------------------------------------------------------------------
    // Overrides and diagnostics
    // ------------------------------------------------------------------

    /// Inject a value that takes precedence over every source.
    pub fn register_key_value(&self, key: &str, value: impl Into<OverrideValue>) {
        let value = value.into();
        let text = value.to_string();
        self.registry.register_key_value(key, value);
        self.registry
            .remember_parameter_source(key, REGISTERED_SOURCE, &text);
        debug!(target: "appenv_config::resolver", key, value = %text, "override registered");
    }

    /// Remove an injected value.
    pub fn unregister_key(&self, key: &str) {
        self.registry.unregister_key(key);
        debug!(target: "appenv_config::resolver", key, "override removed");
    }

    /// True when the latest lookup of `key` fell back to the default.
    pub fn is_default(&self, key: &str) -> bool {
        self.defaulted.contains(key)
    }

    /// Key-sorted provenance log of the shared registry.
    pub fn parameters_sources(&self) -> ParameterSources {
        self.registry.parameters_sources()
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Resolve `key` to a string.
    ///
    /// Returns the expanded value of the first hit, or `default` with its
    /// placeholders expanded (unresolvable ones are kept verbatim). A missing
    /// key is never an error.
    pub fn get_string_value(&self, key: &str, default: Option<&str>) -> Option<String> {
        let root = ExpansionChain::root();
        match self.resolve(key, &root) {
            Some(hit) => {
                self.defaulted.remove(key);
                self.registry
                    .remember_parameter_source(key, &hit.source, &hit.value);
                Some(hit.value)
            }
            None => {
                self.defaulted.insert(key.to_string());
                let value = default.map(|text| self.expand(text, &root));
                trace!(
                    target: "appenv_config::resolver",
                    key,
                    default = value.as_deref().unwrap_or(NULL_TEXT),
                    "falling back to default"
                );
                self.registry.remember_parameter_source(
                    key,
                    DEFAULT_SOURCE,
                    value.as_deref().unwrap_or(NULL_TEXT),
                );
                value
            }
        }
    }

    /// Resolve `key` to a string, falling back to `default`.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get_string_value(key, Some(default))
            .unwrap_or_else(|| default.to_string())
    }

    /// Resolve a multi-valued key.
    ///
    /// Only the registered sources are consulted, not the override registry.
    /// The first source returning a non-empty sequence wins; sequences are
    /// never merged across sources. Each element is expanded on its own.
    /// `defaults` are returned unchanged when nothing is found. The outcome
    /// is recorded in the provenance log but does not affect
    /// [`is_default`](Resolver::is_default).
    pub fn get_string_values(
        &self,
        key: &str,
        defaults: Option<Vec<String>>,
    ) -> Option<Vec<String>> {
        match self.find_many(key) {
            Some((values, source)) => {
                self.registry
                    .remember_parameter_source(key, &source, &values.join(","));
                Some(values)
            }
            None => {
                let joined = defaults
                    .as_ref()
                    .map_or_else(|| NULL_TEXT.to_string(), |values| values.join(","));
                self.registry
                    .remember_parameter_source(key, DEFAULT_SOURCE, &joined);
                defaults
            }
        }
    }

    /// Resolve `key` and convert it to `T`.
    ///
    /// When the resolved text equals the text form of `default`, `default`
    /// itself is returned without conversion. Otherwise a value that does not
    /// convert is an [`Error::Coercion`]; it is not retried against other
    /// sources.
    pub fn get_value<T: ConfigScalar>(&self, key: &str, default: T) -> Result<T> {
        let default_text = default.to_config_string();
        let text = self.get_string(key, &default_text);
        if text == default_text {
            return Ok(default);
        }
        convert(key, &text, T::KIND)?.into_scalar()
    }

    /// Resolve `key` and convert it to the runtime-selected `kind`.
    ///
    /// The default is given as text and converted like any other value.
    pub fn get_typed(&self, key: &str, kind: ValueKind, default: &str) -> Result<TypedValue> {
        let text = self.get_string(key, default);
        convert(key, &text, kind)
    }

    /// Typed multi-value lookup. Not provided: always fails with
    /// [`Error::Unsupported`], whether or not the key exists.
    pub fn get_values<T: ConfigScalar>(
        &self,
        key: &str,
        _defaults: Option<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        Err(Error::Unsupported(format!(
            "typed multi-value lookup of '{}' as {}",
            key,
            T::KIND
        )))
    }

    // ------------------------------------------------------------------
    // Resolution internals
    // ------------------------------------------------------------------

    fn resolve(&self, key: &str, chain: &ExpansionChain<'_>) -> Option<Hit> {
        let hit = self.lookup_raw(key)?;
        let value = self.expand(&hit.value, chain);
        Some(Hit {
            value,
            source: hit.source,
        })
    }

    fn lookup_raw(&self, key: &str) -> Option<Hit> {
        if let Some(value) = self.registry.get_value(key) {
            return value.as_text().map(|value| Hit {
                value,
                source: REGISTERED_SOURCE.to_string(),
            });
        }
        let chain = self.chain.load_full();
        chain.sources.iter().find_map(|source| {
            source.resolve_one(key).map(|value| Hit {
                value,
                source: source.description(),
            })
        })
    }

    fn find_many(&self, key: &str) -> Option<(Vec<String>, String)> {
        let chain = self.chain.load_full();
        let (raw, source) = chain.sources.iter().find_map(|source| {
            source
                .resolve_many(key)
                .filter(|values| !values.is_empty())
                .map(|values| (values, source.description()))
        })?;
        let root = ExpansionChain::root();
        let values = raw
            .iter()
            .map(|value| self.expand(value, &root))
            .collect();
        Some((values, source))
    }

    fn expand(&self, text: &str, chain: &ExpansionChain<'_>) -> String {
        placeholder::expand(text, chain, |name, nested| {
            self.resolve(name, nested).map(|hit| hit.value)
        })
    }
}

/// A resolver can sit in another resolver's chain. Lookups through this
/// interface neither record provenance nor fall back to defaults.
impl ValueSource for Resolver {
    fn description(&self) -> String {
        Resolver::description(self)
    }

    fn resolve_one(&self, key: &str) -> Option<String> {
        self.resolve(key, &ExpansionChain::root())
            .map(|hit| hit.value)
    }

    fn resolve_many(&self, key: &str) -> Option<Vec<String>> {
        self.find_many(key).map(|(values, _)| values)
    }
}

fn remove_source(sources: &mut Vec<SharedSource>, source: &SharedSource) {
    sources.retain(|s| !same_source(s, source));
}

fn convert(key: &str, text: &str, kind: ValueKind) -> Result<TypedValue> {
    coerce(kind, text).ok_or_else(|| Error::Coercion {
        key: key.to_string(),
        value: text.to_string(),
        target: kind,
    })
}
