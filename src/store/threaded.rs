//! Ordered store + indexer behind one RwLock
//!
//! Every mutation takes the write lock and updates both substructures inside
//! it, so a reader never observes one without the other. Index values are
//! computed (and may fail) before the ordered store is touched.

use super::{IndexedStore, Snapshot, Store, StoreConfig};
use crate::error::{Error, Result};
use crate::index::{Indexer, Indexers};
use crate::keys::KeyFunc;
use crate::ordered::OrderedStore;
use crate::types::{Element, Page};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

struct Inner<P> {
    store: OrderedStore<Element<P>>,
    indexer: Indexer<P>,
    /// Bumped by every successful mutation
    generation: u64,
}

pub struct ThreadedStore<P> {
    inner: RwLock<Inner<P>>,
    key_func: KeyFunc<P>,
    config: StoreConfig,
}

impl<P> ThreadedStore<P> {
    pub fn new(key_func: KeyFunc<P>, indexers: Indexers<P>) -> Self {
        Self::with_config(StoreConfig::default(), key_func, indexers)
    }

    pub fn with_config(config: StoreConfig, key_func: KeyFunc<P>, indexers: Indexers<P>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                store: OrderedStore::new(),
                indexer: Indexer::new(indexers),
                generation: 0,
            }),
            key_func,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store key of `payload` according to the configured key function.
    pub fn key_of(&self, payload: &P) -> Result<String> {
        let key = (self.key_func)(payload).map_err(|source| Error::KeyFunc { source })?;
        check_key(&key)?;
        Ok(key)
    }

    // --- Mutations (write lock) ---

    pub fn add(&self, payload: P) -> Result<()> {
        let key = self.key_of(&payload)?;
        self.add_or_update(Element::new(key, payload))
    }

    pub fn update(&self, payload: P) -> Result<()> {
        let key = self.key_of(&payload)?;
        self.add_or_update(Element::new(key, payload))
    }

    /// Add or replace an element whose key the caller built itself.
    pub fn add_element(&self, element: Element<P>) -> Result<()> {
        check_key(element.key())?;
        self.add_or_update(element)
    }

    fn add_or_update(&self, element: Element<P>) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let old = inner.store.get_by_key(element.key()).cloned();
        if let Err(err) = inner.indexer.update_elem(old.as_ref(), Some(&element)) {
            warn!(key = element.key(), error = %err, "rejected element, index update failed");
            return Err(err);
        }
        trace!(key = element.key(), replaced = old.is_some(), "stored element");
        inner.store.update(element);
        inner.generation += 1;
        Ok(())
    }

    pub fn delete(&self, payload: &P) -> Result<()> {
        let key = self.key_of(payload)?;
        self.delete_by_key(&key).map(|_| ())
    }

    /// Remove the element stored under `key` and return it.
    pub fn delete_by_key(&self, key: &str) -> Result<Element<P>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let old = inner
            .store
            .get_by_key(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        if let Err(err) = inner.indexer.update_elem(Some(&old), None) {
            warn!(key, error = %err, "kept element, index removal failed");
            return Err(err);
        }
        inner.store.delete_by_key(key)?;
        inner.generation += 1;
        trace!(key, "deleted element");
        Ok(old)
    }

    /// Discard all content and load `payloads`. Nothing changes on error.
    pub fn replace(&self, payloads: Vec<P>, resource_version: &str) -> Result<()> {
        let elements = payloads
            .into_iter()
            .map(|payload| -> Result<Element<P>> {
                let key = self.key_of(&payload)?;
                Ok(Element::new(key, payload))
            })
            .collect::<Result<Vec<_>>>()?;
        self.replace_elements(elements, resource_version)
    }

    /// Discard all content and load `elements`. A key given more than once
    /// keeps its last element. Nothing changes on error.
    pub fn replace_elements(&self, elements: Vec<Element<P>>, resource_version: &str) -> Result<()> {
        for element in &elements {
            check_key(element.key())?;
        }
        let mut store = OrderedStore::new();
        store.replace(elements, resource_version);

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if let Err(err) = inner.indexer.replace(store.iter()) {
            warn!(resource_version, error = %err, "replace aborted, index rebuild failed");
            return Err(err);
        }
        debug!(count = store.len(), resource_version, "replaced store contents");
        inner.store = store;
        inner.generation += 1;
        Ok(())
    }

    /// No-op, the store holds no state that needs periodic reconciliation.
    pub fn resync(&self) -> Result<()> {
        Ok(())
    }

    // --- Queries (read lock) ---

    pub fn get(&self, payload: &P) -> Result<Option<Element<P>>> {
        let key = self.key_of(payload)?;
        Ok(self.get_by_key(&key))
    }

    pub fn get_by_key(&self, key: &str) -> Option<Element<P>> {
        self.inner.read().store.get_by_key(key).cloned()
    }

    pub fn list(&self) -> Vec<Element<P>> {
        self.inner.read().store.list()
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.inner.read().store.list_keys()
    }

    /// Elements whose key starts with `prefix`, resuming at `continue_key`
    /// when it is non-empty. See `OrderedStore::list_prefix`.
    pub fn list_prefix(&self, prefix: &str, continue_key: &str, limit: usize) -> Result<Page<Element<P>>> {
        self.config.check_prefix(prefix)?;
        let limit = self.config.page_limit(limit);
        Ok(self.inner.read().store.list_prefix(prefix, continue_key, limit))
    }

    pub fn count(&self, prefix: &str, continue_key: &str) -> Result<usize> {
        self.config.check_prefix(prefix)?;
        Ok(self.inner.read().store.count(prefix, continue_key))
    }

    pub fn by_index(&self, index: &str, value: &str) -> Result<Vec<Element<P>>> {
        self.inner.read().indexer.by_index(index, value)
    }

    pub fn index_keys(&self, index: &str, value: &str) -> Result<Vec<String>> {
        self.inner.read().indexer.index_keys(index, value)
    }

    pub fn list_index_values(&self, index: &str) -> Result<Vec<String>> {
        self.inner.read().indexer.list_index_values(index)
    }

    /// Buckets currently retained by `index`.
    pub fn index_bucket_count(&self, index: &str) -> Result<usize> {
        self.inner.read().indexer.bucket_count(index)
    }

    /// Point-in-time view of the ordered store that reads without locking.
    ///
    /// Taking the snapshot is O(1), but while it is alive the next write to
    /// the store copies the whole tree under the write lock. Avoid holding
    /// snapshots across a stream of writes on a hot path.
    pub fn snapshot(&self) -> Snapshot<P> {
        let inner = self.inner.read();
        debug!(count = inner.store.len(), generation = inner.generation, "took snapshot");
        Snapshot::new(inner.store.clone(), inner.generation, self.config.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().store.is_empty()
    }

    /// Resource version given to the last replace.
    pub fn resource_version(&self) -> String {
        self.inner.read().store.resource_version().to_string()
    }

    /// Number of successful mutations so far.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("element key must not be empty".to_string()));
    }
    Ok(())
}

impl<P: Send + Sync> Store<P> for ThreadedStore<P> {
    fn add(&self, payload: P) -> Result<()> {
        ThreadedStore::add(self, payload)
    }

    fn update(&self, payload: P) -> Result<()> {
        ThreadedStore::update(self, payload)
    }

    fn delete(&self, payload: &P) -> Result<()> {
        ThreadedStore::delete(self, payload)
    }

    fn list(&self) -> Vec<Element<P>> {
        ThreadedStore::list(self)
    }

    fn list_keys(&self) -> Vec<String> {
        ThreadedStore::list_keys(self)
    }

    fn get(&self, payload: &P) -> Result<Option<Element<P>>> {
        ThreadedStore::get(self, payload)
    }

    fn get_by_key(&self, key: &str) -> Option<Element<P>> {
        ThreadedStore::get_by_key(self, key)
    }

    fn replace(&self, payloads: Vec<P>, resource_version: &str) -> Result<()> {
        ThreadedStore::replace(self, payloads, resource_version)
    }

    fn resync(&self) -> Result<()> {
        ThreadedStore::resync(self)
    }
}

impl<P: Send + Sync> IndexedStore<P> for ThreadedStore<P> {
    fn by_index(&self, index: &str, value: &str) -> Result<Vec<Element<P>>> {
        ThreadedStore::by_index(self, index, value)
    }

    fn index_keys(&self, index: &str, value: &str) -> Result<Vec<String>> {
        ThreadedStore::index_keys(self, index, value)
    }

    fn list_index_values(&self, index: &str) -> Result<Vec<String>> {
        ThreadedStore::list_index_values(self, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{index_func, Indexers};
    use crate::store::PrefixMode;
    use smallvec::smallvec;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Pod {
        name: String,
        node: String,
    }

    fn pod(name: &str, node: &str) -> Pod {
        Pod {
            name: name.to_string(),
            node: node.to_string(),
        }
    }

    fn make_store() -> ThreadedStore<Pod> {
        let key_func: KeyFunc<Pod> = Arc::new(|p: &Pod| Ok(format!("/pods/{}", p.name)));
        let mut indexers: Indexers<Pod> = Indexers::new();
        indexers.insert(
            "node".into(),
            index_func(|p: &Pod| {
                if p.node == "broken" {
                    return Err("node name is reserved".into());
                }
                Ok(smallvec![p.node.clone()])
            }),
        );
        ThreadedStore::new(key_func, indexers)
    }

    #[test]
    fn test_add_get_delete() {
        let store = make_store();
        store.add(pod("a", "n1")).unwrap();
        store.add(pod("b", "n1")).unwrap();

        let got = store.get(&pod("a", "")).unwrap().unwrap();
        assert_eq!(got.payload(), &pod("a", "n1"));
        assert_eq!(store.list_keys(), vec!["/pods/a", "/pods/b"]);

        store.delete(&pod("a", "")).unwrap();
        assert!(store.get_by_key("/pods/a").is_none());
        assert_eq!(store.index_keys("node", "n1").unwrap(), vec!["/pods/b"]);
        assert!(matches!(store.delete(&pod("a", "")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_reindexes() {
        let store = make_store();
        store.add(pod("a", "n1")).unwrap();
        store.update(pod("a", "n2")).unwrap();

        assert!(store.by_index("node", "n1").unwrap().is_empty());
        assert_eq!(store.by_index("node", "n2").unwrap()[0].payload().node, "n2");
        assert_eq!(store.index_bucket_count("node").unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_index_failure_changes_nothing() {
        let store = make_store();
        store.add(pod("a", "n1")).unwrap();
        let generation = store.generation();

        assert!(matches!(store.update(pod("a", "broken")), Err(Error::IndexFunc { .. })));
        assert_eq!(store.get_by_key("/pods/a").unwrap().payload().node, "n1");
        assert_eq!(store.index_keys("node", "n1").unwrap(), vec!["/pods/a"]);
        assert_eq!(store.generation(), generation);

        assert!(store.add(pod("b", "broken")).is_err());
        assert!(store.get_by_key("/pods/b").is_none());
    }

    #[test]
    fn test_key_func_errors() {
        let key_func: KeyFunc<Pod> = Arc::new(|p: &Pod| {
            if p.name.starts_with('!') {
                return Err("bad name".into());
            }
            Ok(p.name.clone())
        });
        let store = ThreadedStore::new(key_func, Indexers::new());

        assert!(matches!(store.add(pod("!x", "n1")), Err(Error::KeyFunc { .. })));
        assert!(matches!(store.add(pod("", "n1")), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            store.add_element(Element::new("", pod("", "n1"))),
            Err(Error::InvalidArgument(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_is_all_or_nothing() {
        let store = make_store();
        store.add(pod("old", "n0")).unwrap();

        let err = store.replace(vec![pod("a", "n1"), pod("b", "broken")], "7");
        assert!(err.is_err());
        assert_eq!(store.list_keys(), vec!["/pods/old"]);
        assert_eq!(store.list_index_values("node").unwrap(), vec!["n0"]);

        store.replace(vec![pod("a", "n1"), pod("b", "n2")], "8").unwrap();
        assert_eq!(store.list_keys(), vec!["/pods/a", "/pods/b"]);
        assert_eq!(store.list_index_values("node").unwrap(), vec!["n1", "n2"]);
        assert_eq!(store.resource_version(), "8");
    }

    #[test]
    fn test_replace_duplicate_keys_keep_last() {
        let store = make_store();
        store
            .replace(vec![pod("a", "n1"), pod("a", "n2")], "1")
            .unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.by_index("node", "n1").unwrap().is_empty());
        assert_eq!(store.index_keys("node", "n2").unwrap(), vec!["/pods/a"]);
    }

    #[test]
    fn test_segmented_prefix_mode() {
        let config = StoreConfig::new(PrefixMode::Segmented).max_page_size(2);
        let key_func: KeyFunc<Pod> = Arc::new(|p: &Pod| Ok(format!("/pods/{}", p.name)));
        let store = ThreadedStore::with_config(config, key_func, Indexers::new());
        assert_eq!(store.config().prefix_mode, PrefixMode::Segmented);
        assert_eq!(store.config().max_page_size, 2);
        for name in ["a", "b", "c"] {
            store.add(pod(name, "n1")).unwrap();
        }

        assert!(matches!(store.list_prefix("/pods", "", 0), Err(Error::InvalidArgument(_))));
        assert!(store.count("/pods", "").is_err());

        let page = store.list_prefix("/pods/", "", 0).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.has_more);
        assert_eq!(store.count("/pods/", "").unwrap(), 3);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let store = make_store();
        store.add(pod("a", "n1")).unwrap();
        let snapshot = store.snapshot();

        store.add(pod("b", "n1")).unwrap();
        store.delete_by_key("/pods/a").unwrap();

        assert_eq!(snapshot.list_keys(), vec!["/pods/a"]);
        assert_eq!(store.list_keys(), vec!["/pods/b"]);
        assert!(snapshot.generation() < store.generation());
    }

    #[test]
    fn test_unknown_index() {
        let store = make_store();
        assert!(matches!(store.by_index("zone", "z"), Err(Error::IndexNotFound(_))));
        assert!(store.resync().is_ok());
    }
}
