// watchstore - ordered, indexed, concurrency-safe in-memory object store
// Backs watch caches serving list/get/watch queries from memory

pub mod error;
pub mod types;
pub mod keys;
pub mod ordered;
pub mod index;
pub mod store;

// Re-export main types
pub use error::{BoxError, Error, Result};
pub use types::{Element, IndexValues, Keyed, Page};
pub use keys::{successor, KeyFunc};
pub use ordered::OrderedStore;
pub use index::{IndexFunc, Indexer, Indexers};
pub use store::{IndexedStore, PrefixMode, Snapshot, Store, StoreConfig, ThreadedStore};
