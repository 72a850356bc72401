//! The value source contract.

use std::sync::Arc;

/// A configuration origin the resolver can consult.
///
/// Returning `None` means the source does not know the key. Adapters report
/// absence that way instead of failing, even when their backing store is
/// unreachable. The resolver may call a source from many threads at once and
/// never holds its own locks while doing so, so implementations are free to
/// block on I/O or to call back into a resolver.
pub trait ValueSource: Send + Sync {
    /// Human-readable name, e.g. the origin plus a file path.
    fn description(&self) -> String;

    /// Look up a single value.
    fn resolve_one(&self, key: &str) -> Option<String>;

    /// Look up all values of a multi-valued key.
    ///
    /// The default wraps [`resolve_one`](ValueSource::resolve_one) in a
    /// one-element sequence.
    fn resolve_many(&self, key: &str) -> Option<Vec<String>> {
        self.resolve_one(key).map(|value| vec![value])
    }
}

/// Shared handle to a source. Two handles name the same source when they
/// point at the same allocation.
pub type SharedSource = Arc<dyn ValueSource>;

/// Identity comparison for source handles.
pub fn same_source(a: &SharedSource, b: &SharedSource) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
