//! Per-index value buckets
//!
//! `ValueIndex` maps each index value to the `ElementSet` of elements that
//! currently produce it. A bucket that loses its last member is dropped from
//! the map, so short-lived or high-cardinality values do not accumulate.

use ahash::AHashMap;
use std::collections::BTreeMap;

/// Elements sharing one index value, keyed (and ordered) by element key.
#[derive(Clone, Debug)]
pub struct ElementSet<T> {
    members: BTreeMap<String, T>,
}

impl<T: Clone> ElementSet<T> {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Insert or overwrite the member stored under `key`.
    pub fn insert(&mut self, key: &str, item: T) -> Option<T> {
        if let Some(slot) = self.members.get_mut(key) {
            return Some(std::mem::replace(slot, item));
        }
        self.members.insert(key.to_string(), item);
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        self.members.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    pub fn items(&self) -> Vec<T> {
        self.members.values().cloned().collect()
    }
}

impl<T: Clone> Default for ElementSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// index value -> elements producing it
#[derive(Clone, Debug)]
pub struct ValueIndex<T> {
    buckets: AHashMap<String, ElementSet<T>>,
}

impl<T: Clone> ValueIndex<T> {
    pub fn new() -> Self {
        Self {
            buckets: AHashMap::new(),
        }
    }

    pub fn insert(&mut self, value: &str, key: &str, item: T) {
        if let Some(bucket) = self.buckets.get_mut(value) {
            bucket.insert(key, item);
            return;
        }
        let mut bucket = ElementSet::new();
        bucket.insert(key, item);
        self.buckets.insert(value.to_string(), bucket);
    }

    /// Remove `key` from the bucket for `value`, dropping the bucket once it
    /// is empty. Returns whether the key was present.
    pub fn remove(&mut self, value: &str, key: &str) -> bool {
        let Some(bucket) = self.buckets.get_mut(value) else {
            return false;
        };
        let removed = bucket.remove(key).is_some();
        if bucket.is_empty() {
            self.buckets.remove(value);
        }
        removed
    }

    pub fn get(&self, value: &str) -> Option<&ElementSet<T>> {
        self.buckets.get(value)
    }

    /// Every value with at least one member, sorted.
    pub fn values(&self) -> Vec<String> {
        let mut values: Vec<String> = self.buckets.keys().cloned().collect();
        values.sort_unstable();
        values
    }

    /// Number of retained buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl<T: Clone> Default for ValueIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
