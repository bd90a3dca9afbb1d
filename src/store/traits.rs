//! Store Traits

use crate::error::Result;
use crate::types::Element;

/// Generic observable store, the contract a watch cache consumes.
///
/// Implementations:
/// - `ThreadedStore` - ordered store + indexer behind one RwLock
pub trait Store<P>: Send + Sync {
    /// Insert a payload, replacing any element with the same key
    fn add(&self, payload: P) -> Result<()>;

    /// Replace the element with the payload's key (inserts when absent)
    fn update(&self, payload: P) -> Result<()>;

    /// Remove the element with the payload's key
    fn delete(&self, payload: &P) -> Result<()>;

    /// All elements, ascending by key
    fn list(&self) -> Vec<Element<P>>;

    /// All keys, ascending
    fn list_keys(&self) -> Vec<String>;

    /// Element stored under the payload's key
    fn get(&self, payload: &P) -> Result<Option<Element<P>>>;

    /// Element stored under `key`
    fn get_by_key(&self, key: &str) -> Option<Element<P>>;

    /// Discard all content and load `payloads`
    fn replace(&self, payloads: Vec<P>, resource_version: &str) -> Result<()>;

    /// Periodic resync hook
    fn resync(&self) -> Result<()>;
}

/// A `Store` that also answers secondary-index queries.
pub trait IndexedStore<P>: Store<P> {
    /// Elements indexed under `value` by the index `index`
    fn by_index(&self, index: &str, value: &str) -> Result<Vec<Element<P>>>;

    /// Keys indexed under `value` by the index `index`
    fn index_keys(&self, index: &str, value: &str) -> Result<Vec<String>>;

    /// All values with at least one element in the index `index`
    fn list_index_values(&self, index: &str) -> Result<Vec<String>>;
}
