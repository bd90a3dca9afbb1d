use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Values produced by an index function for one payload.
/// Inline for the common single-value case.
pub type IndexValues = SmallVec<[String; 1]>;

/// Anything that carries its own store key.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl<T: Keyed + ?Sized> Keyed for Arc<T> {
    fn key(&self) -> &str {
        (**self).key()
    }
}

// ============ ELEMENT ============

/// The stored unit: a key plus a shared payload.
///
/// Cloning is cheap, the payload is reference counted. Replacing an element
/// under the same key produces a new `Element` that occupies the old slot.
pub struct Element<P> {
    key: String,
    payload: Arc<P>,
}

impl<P> Element<P> {
    pub fn new(key: impl Into<String>, payload: P) -> Self {
        Self::from_arc(key, Arc::new(payload))
    }

    pub fn from_arc(key: impl Into<String>, payload: Arc<P>) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Shared handle to the payload, for callers that keep it past the element.
    pub fn payload_arc(&self) -> &Arc<P> {
        &self.payload
    }
}

impl<P> Clone for Element<P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<P> Keyed for Element<P> {
    fn key(&self) -> &str {
        &self.key
    }
}

impl<P: fmt::Debug> fmt::Debug for Element<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("key", &self.key)
            .field("payload", &self.payload)
            .finish()
    }
}

impl<P: PartialEq> PartialEq for Element<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.payload == other.payload
    }
}

impl<P: Eq> Eq for Element<P> {}

// ============ PAGE ============

/// One page of a prefix listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// A further matching element exists past the last item.
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Keyed> Page<T> {
    /// Continuation key for the next page, `None` once the listing is exhausted.
    pub fn continue_key(&self) -> Option<String> {
        if !self.has_more {
            return None;
        }
        self.items.last().map(|item| crate::keys::successor(item.key()))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.key()).collect()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
