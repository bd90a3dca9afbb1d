//! Error types for store, index and key operations.

use thiserror::Error;

/// Boxed error returned by caller-supplied key and index functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mutating or querying a store.
#[derive(Debug, Error)]
pub enum Error {
    /// The argument cannot be stored or queried (empty key, prefix violating
    /// the configured prefix policy).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Delete of a key that is not present.
    #[error("key {0:?} does not exist")]
    NotFound(String),

    /// Query against an index name that was never registered.
    #[error("index {0:?} does not exist")]
    IndexNotFound(String),

    /// The configured key function failed for a payload.
    #[error("key function failed: {source}")]
    KeyFunc {
        #[source]
        source: BoxError,
    },

    /// An index function failed while computing values for an element.
    #[error("index {index:?} failed for key {key:?}: {source}")]
    IndexFunc {
        index: String,
        key: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Whether the error means the store may have diverged from its upstream
    /// source and should be rebuilt with a full replace. Every error a
    /// mutation can return qualifies; `IndexNotFound` only comes from queries.
    pub fn requires_resync(&self) -> bool {
        !matches!(self, Error::IndexNotFound(_))
    }
}
