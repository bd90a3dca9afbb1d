//! Secondary Indexer
//!
//! Owns one `ValueIndex` per registered index function and keeps them in step
//! with the elements of the ordered store. Updates run in two phases: every
//! index function is evaluated for the old and the new element first, and the
//! buckets are only touched once all of them succeeded.

use super::{IndexFunc, Indexers, ValueIndex};
use crate::error::{Error, Result};
use crate::types::{Element, IndexValues};
use ahash::AHashMap;

type Indices<P> = AHashMap<String, ValueIndex<Element<P>>>;

/// Old and new values of one index for one element.
struct Delta<'a> {
    index: &'a str,
    old: IndexValues,
    new: IndexValues,
}

pub struct Indexer<P> {
    indexers: Indexers<P>,
    indices: Indices<P>,
}

impl<P> Indexer<P> {
    pub fn new(indexers: Indexers<P>) -> Self {
        let indices = empty_indices(&indexers);
        Self { indexers, indices }
    }

    /// Move the element's index entries from the values of `old` to the values
    /// of `new`. `None` for `old` is a pure insert, `None` for `new` a pure
    /// delete. Both elements must carry the same key, else `InvalidArgument`.
    ///
    /// On error no index has been modified.
    pub fn update_elem(&mut self, old: Option<&Element<P>>, new: Option<&Element<P>>) -> Result<()> {
        update_indices(&self.indexers, &mut self.indices, old, new)
    }

    /// Rebuild every index from `items`. The current indices are kept if any
    /// index function fails.
    pub fn replace<'a, I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Element<P>>,
        P: 'a,
    {
        let mut rebuilt = empty_indices(&self.indexers);
        for item in items {
            update_indices(&self.indexers, &mut rebuilt, None, Some(item))?;
        }
        self.indices = rebuilt;
        Ok(())
    }

    /// Elements currently indexed under `value`, ascending by key.
    pub fn by_index(&self, index: &str, value: &str) -> Result<Vec<Element<P>>> {
        Ok(self
            .index(index)?
            .get(value)
            .map(|bucket| bucket.items())
            .unwrap_or_default())
    }

    /// Keys currently indexed under `value`, ascending.
    pub fn index_keys(&self, index: &str, value: &str) -> Result<Vec<String>> {
        Ok(self
            .index(index)?
            .get(value)
            .map(|bucket| bucket.keys())
            .unwrap_or_default())
    }

    /// Every value of `index` with at least one element, sorted.
    pub fn list_index_values(&self, index: &str) -> Result<Vec<String>> {
        Ok(self.index(index)?.values())
    }

    /// Number of buckets retained by `index`.
    pub fn bucket_count(&self, index: &str) -> Result<usize> {
        Ok(self.index(index)?.bucket_count())
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexers.keys().map(String::as_str)
    }

    fn index(&self, name: &str) -> Result<&ValueIndex<Element<P>>> {
        self.indices
            .get(name)
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))
    }
}

fn empty_indices<P>(indexers: &Indexers<P>) -> Indices<P> {
    indexers
        .keys()
        .map(|name| (name.clone(), ValueIndex::new()))
        .collect()
}

fn update_indices<P>(
    indexers: &Indexers<P>,
    indices: &mut Indices<P>,
    old: Option<&Element<P>>,
    new: Option<&Element<P>>,
) -> Result<()> {
    let key = match new.or(old) {
        Some(elem) => elem.key(),
        None => return Ok(()),
    };
    if let (Some(o), Some(n)) = (old, new) {
        if o.key() != n.key() {
            return Err(Error::InvalidArgument(format!(
                "old and new element keys differ: {:?} != {:?}",
                o.key(),
                n.key()
            )));
        }
    }

    let mut deltas = Vec::with_capacity(indexers.len());
    for (name, func) in indexers {
        deltas.push(Delta {
            index: name,
            old: index_values(name, func, key, old)?,
            new: index_values(name, func, key, new)?,
        });
    }

    for delta in deltas {
        // Every registered name gets its ValueIndex at construction.
        let Some(index) = indices.get_mut(delta.index) else {
            continue;
        };

        // Single unchanged value: refresh the stored element in place.
        if delta.old.len() == 1 && delta.new.len() == 1 && delta.old[0] == delta.new[0] {
            if let Some(elem) = new {
                index.insert(&delta.new[0], key, elem.clone());
            }
            continue;
        }

        for value in &delta.old {
            index.remove(value, key);
        }
        if let Some(elem) = new {
            for value in &delta.new {
                index.insert(value, key, elem.clone());
            }
        }
    }
    Ok(())
}

fn index_values<P>(
    name: &str,
    func: &IndexFunc<P>,
    key: &str,
    elem: Option<&Element<P>>,
) -> Result<IndexValues> {
    match elem {
        Some(elem) => func(elem.payload()).map_err(|source| Error::IndexFunc {
            index: name.to_string(),
            key: key.to_string(),
            source,
        }),
        None => Ok(IndexValues::new()),
    }
}
