//! The shared queue of input files waiting to be processed.

use std::collections::VecDeque;
use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::Mutex;
use rf_core::InputName;

/// A cloneable handle to the pending input queue.
///
/// The crawler's debounce loop pushes and removes entries while the worker
/// pops them from another thread. Ordering is first-in first-out, except
/// that a file already queued is never queued twice.
///
/// # Examples
///
/// ```
/// use rf_core::InputName;
/// use rf_watcher::PendingQueue;
///
/// let queue = PendingQueue::new();
/// let input = InputName::parse("/in/a_b_c.csv", "csv").unwrap();
///
/// assert!(queue.push_unique(input.clone()));
/// assert!(!queue.push_unique(input));
/// assert_eq!(queue.len(), 1);
/// assert_eq!(queue.pop().map(|i| i.customer().to_owned()), Some("a".to_owned()));
/// assert!(queue.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    inner: Arc<Mutex<VecDeque<InputName>>>,
}

impl PendingQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `input` unless a file with the same path is already queued.
    ///
    /// Returns `true` if the input was added.
    pub fn push_unique(&self, input: InputName) -> bool {
        let mut queue = self.inner.lock();
        if queue.iter().any(|queued| queued.path() == input.path()) {
            return false;
        }
        queue.push_back(input);
        true
    }

    /// Removes the entry for `path`, if queued.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&self, path: &Utf8Path) -> bool {
        let mut queue = self.inner.lock();
        match queue.iter().position(|queued| queued.path() == path) {
            Some(position) => queue.remove(position).is_some(),
            None => false,
        }
    }

    /// Takes the oldest entry.
    pub fn pop(&self) -> Option<InputName> {
        self.inner.lock().pop_front()
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
