//! Threaded Store Module
//!
//! The ordered store and the secondary indexer composed behind one
//! reader/writer lock, plus lock-free snapshots of the ordered store.
//!
//! # Example
//! ```ignore
//! use watchstore::keys::namespaced_key_func;
//! use watchstore::index::{namespace_index, Indexers, NAMESPACE_INDEX};
//! use watchstore::store::{PrefixMode, StoreConfig, ThreadedStore};
//!
//! let mut indexers = Indexers::new();
//! indexers.insert(NAMESPACE_INDEX.to_string(), namespace_index());
//!
//! let config = StoreConfig::new(PrefixMode::Segmented);
//! let store = ThreadedStore::with_config(config, namespaced_key_func("/pods"), indexers);
//! ```

mod snapshot;
mod threaded;
mod traits;

pub use snapshot::Snapshot;
pub use threaded::ThreadedStore;
pub use traits::{IndexedStore, Store};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How `list_prefix` and `count` treat their prefix argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixMode {
    /// Plain byte prefix. `"/a"` matches `"/ab"`; callers append the
    /// separator themselves when they mean a path segment.
    #[default]
    Raw,

    /// Non-empty prefixes must end with the separator.
    Segmented,
}

impl PrefixMode {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "raw" | "plain" | "off" | "none" => PrefixMode::Raw,
            "segmented" | "strict" | "on" | "segment" => PrefixMode::Segmented,
            _ => PrefixMode::default(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix policy for range scans
    pub prefix_mode: PrefixMode,
    /// Key path separator
    pub separator: char,
    /// Upper bound on a `list_prefix` page (0 = unbounded)
    pub max_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix_mode: PrefixMode::default(),
            separator: '/',
            max_page_size: 0,
        }
    }
}

impl StoreConfig {
    /// Create config with specific prefix mode
    pub fn new(prefix_mode: PrefixMode) -> Self {
        Self {
            prefix_mode,
            ..Default::default()
        }
    }

    /// Set prefix mode
    pub fn prefix_mode(mut self, mode: PrefixMode) -> Self {
        self.prefix_mode = mode;
        self
    }

    /// Set key separator
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set maximum page size
    pub fn max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max;
        self
    }

    pub(crate) fn check_prefix(&self, prefix: &str) -> Result<()> {
        if self.prefix_mode == PrefixMode::Segmented
            && !prefix.is_empty()
            && !prefix.ends_with(self.separator)
        {
            return Err(Error::InvalidArgument(format!(
                "prefix {prefix:?} must end with {:?}",
                self.separator
            )));
        }
        Ok(())
    }

    /// Effective limit for a requested page size.
    pub(crate) fn page_limit(&self, limit: usize) -> usize {
        match self.max_page_size {
            0 => limit,
            max if limit == 0 || limit > max => max,
            _ => limit,
        }
    }
}
