//! Observer registration primitives.
//!
//! An [`ObserverSet`] is the ordered collection of observer callbacks hanging
//! off a lane view. Registration appends, removal filters, and both swap in
//! a freshly-built immutable sequence rather than mutating the old one: a
//! relay that captured the previous sequence keeps dispatching against it
//! unaffected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

static OBSERVER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a registered observer, used for deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        ObserverId(OBSERVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// One registered observer: its identity, its preemption capability, and the
/// callback payload itself.
///
/// A preemptive observer may run on the mutating caller's thread. A
/// non-preemptive observer must run on the background stage; its presence
/// makes the per-view dispatch step report non-completion on a preemptive
/// pass.
#[derive(Clone)]
pub struct ObserverEntry<T> {
    /// Registration identity.
    pub id: ObserverId,
    /// Whether the callback may run on the caller's thread.
    pub preemptive: bool,
    /// The callback payload.
    pub observer: T,
}

/// An ordered, copy-on-write set of observers.
pub struct ObserverSet<T> {
    entries: RwLock<Arc<[ObserverEntry<T>]>>,
}

impl<T: Clone> ObserverSet<T> {
    /// Create an empty observer set.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Register an observer, returning its id.
    ///
    /// Registration order is dispatch order.
    pub fn observe(&self, observer: T, preemptive: bool) -> ObserverId {
        let id = ObserverId::next();
        let mut entries = self.entries.write();
        let mut next: Vec<ObserverEntry<T>> = entries.iter().cloned().collect();
        next.push(ObserverEntry {
            id,
            preemptive,
            observer,
        });
        *entries = Arc::from(next);
        id
    }

    /// Deregister an observer by id. Returns whether it was present.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|entry| entry.id == id) {
            return false;
        }
        let next: Vec<ObserverEntry<T>> = entries
            .iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect();
        *entries = Arc::from(next);
        true
    }

    /// The current immutable dispatch sequence.
    pub fn snapshot(&self) -> Arc<[ObserverEntry<T>]> {
        self.entries.read().clone()
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: Clone> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
