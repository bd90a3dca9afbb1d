//! Snapshot Implementation

use super::StoreConfig;
use crate::error::Result;
use crate::ordered::OrderedStore;
use crate::types::{Element, Page};

/// A read-only view of a store at a point in time
///
/// Shares the ordered tree with the store it was taken from until the store
/// is next written, so taking one is O(1). Reads need no lock. Secondary
/// indices are not part of the view.
pub struct Snapshot<P> {
    store: OrderedStore<Element<P>>,
    /// Store generation the view was taken at
    generation: u64,
    config: StoreConfig,
}

impl<P> Snapshot<P> {
    pub(crate) fn new(store: OrderedStore<Element<P>>, generation: u64, config: StoreConfig) -> Self {
        Self {
            store,
            generation,
            config,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get_by_key(&self, key: &str) -> Option<&Element<P>> {
        self.store.get_by_key(key)
    }

    pub fn list(&self) -> Vec<Element<P>> {
        self.store.list()
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.store.list_keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element<P>> {
        self.store.iter()
    }

    pub fn list_prefix(&self, prefix: &str, continue_key: &str, limit: usize) -> Result<Page<Element<P>>> {
        self.config.check_prefix(prefix)?;
        let limit = self.config.page_limit(limit);
        Ok(self.store.list_prefix(prefix, continue_key, limit))
    }

    pub fn count(&self, prefix: &str, continue_key: &str) -> Result<usize> {
        self.config.check_prefix(prefix)?;
        Ok(self.store.count(prefix, continue_key))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn resource_version(&self) -> &str {
        self.store.resource_version()
    }
}

impl<P> Clone for Snapshot<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            generation: self.generation,
            config: self.config.clone(),
        }
    }
}
