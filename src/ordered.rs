//! Ordered Store for O(log n) point and prefix-range access
//!
//! Elements are kept in a B-tree keyed by their string key, so iteration is
//! always strictly ascending in byte order. All keys sharing a prefix form one
//! contiguous run, which lets a prefix scan start at the prefix and stop at
//! the first key that no longer matches.
//!
//! The tree sits behind an `Arc`: `clone()` is O(1) and the first write to
//! either copy detaches it.

use crate::error::{Error, Result};
use crate::types::{Keyed, Page};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

pub struct OrderedStore<T> {
    tree: Arc<BTreeMap<String, T>>,
    resource_version: String,
}

impl<T: Keyed + Clone> OrderedStore<T> {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(BTreeMap::new()),
            resource_version: String::new(),
        }
    }

    /// Insert or replace by key. Returns the element previously stored under it.
    pub fn add(&mut self, item: T) -> Option<T> {
        self.update(item)
    }

    /// Insert or replace by key. Returns the element previously stored under it.
    pub fn update(&mut self, item: T) -> Option<T> {
        let key = item.key().to_string();
        Arc::make_mut(&mut self.tree).insert(key, item)
    }

    pub fn delete(&mut self, item: &T) -> Result<T> {
        self.delete_by_key(item.key())
    }

    pub fn delete_by_key(&mut self, key: &str) -> Result<T> {
        if !self.tree.contains_key(key) {
            return Err(Error::NotFound(key.to_string()));
        }
        Arc::make_mut(&mut self.tree)
            .remove(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn get(&self, item: &T) -> Option<&T> {
        self.get_by_key(item.key())
    }

    pub fn get_by_key(&self, key: &str) -> Option<&T> {
        self.tree.get(key)
    }

    /// All elements, ascending by key.
    pub fn list(&self) -> Vec<T> {
        self.tree.values().cloned().collect()
    }

    /// All keys, ascending.
    pub fn list_keys(&self) -> Vec<String> {
        self.tree.keys().cloned().collect()
    }

    /// Ascending iterator over every element.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tree.values()
    }

    /// Discard all content and rebuild from `items`. A key given more than
    /// once keeps its last element.
    pub fn replace<I>(&mut self, items: I, resource_version: &str)
    where
        I: IntoIterator<Item = T>,
    {
        let tree: BTreeMap<String, T> = items
            .into_iter()
            .map(|item| (item.key().to_string(), item))
            .collect();
        self.tree = Arc::new(tree);
        self.resource_version = resource_version.to_string();
    }

    /// Elements whose key starts with `prefix`, beginning at `continue_key`
    /// (inclusive) when it is non-empty, else at `prefix`.
    ///
    /// `limit == 0` collects every match. Otherwise at most `limit` items are
    /// returned and `has_more` reports whether another match follows.
    ///
    /// The prefix test is a plain byte prefix: `"/a"` also matches `"/ab"`.
    /// Callers wanting path-segment semantics pass a prefix ending in the
    /// separator.
    pub fn list_prefix(&self, prefix: &str, continue_key: &str, limit: usize) -> Page<T> {
        let mut page = Page::empty();
        for item in self.scan(prefix, continue_key) {
            if limit > 0 && page.items.len() >= limit {
                page.has_more = true;
                break;
            }
            page.items.push(item.clone());
        }
        page
    }

    /// Number of elements `list_prefix(prefix, continue_key, 0)` would return.
    pub fn count(&self, prefix: &str, continue_key: &str) -> usize {
        self.scan(prefix, continue_key).count()
    }

    fn scan<'a>(&'a self, prefix: &'a str, continue_key: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        let start = if continue_key.is_empty() { prefix } else { continue_key };
        self.tree
            .range::<str, _>((Bound::Included(start), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Resource version recorded by the last `replace`.
    pub fn resource_version(&self) -> &str {
        &self.resource_version
    }

    /// Whether `self` and `other` still share one tree.
    pub fn shares_tree_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }
}

impl<T> Clone for OrderedStore<T> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            resource_version: self.resource_version.clone(),
        }
    }
}

impl<T: Keyed + Clone> Default for OrderedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
