//! Keyed, indexable sequence storage backing a list lane.
//!
//! Storage is an external collaborator of the dispatch core: the relay never
//! owns this data, it only reads and writes it through [`ListData`] during
//! the apply sub-step of a phase. All operations are synchronous and
//! side-effect-isolated to one lane. [`MemoryListData`] is the in-process
//! implementation.

use uuid::Uuid;

/// One stored element: a generated or caller-supplied key plus the value.
///
/// Keys identify entries stably across index shifts, so remote subscribers
/// can reconcile structural mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry<V> {
    /// Stable entry key.
    pub key: Uuid,
    /// The element value.
    pub value: V,
}

/// Keyed, index-addressable ordered storage.
pub trait ListData<V>: Send {
    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Whether the sequence is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, if present.
    fn get(&self, index: usize) -> Option<V>;

    /// Entry (key + value) at `index`, if present.
    fn get_entry(&self, index: usize) -> Option<ListEntry<V>>;

    /// Position of the entry with `key`, if present.
    fn index_of_key(&self, key: &Uuid) -> Option<usize>;

    /// Resolve an index through an optional key guard.
    ///
    /// With no key, the index is taken as-is. With a key, the entry at
    /// `index` must carry it; otherwise the key is located by scan. A key
    /// that matches nothing resolves to no position, regardless of the
    /// index.
    fn resolve(&self, index: usize, key: Option<&Uuid>) -> Option<usize> {
        match key {
            None => {
                if index < self.len() {
                    Some(index)
                } else {
                    None
                }
            }
            Some(key) => {
                if self
                    .get_entry(index)
                    .map(|entry| entry.key == *key)
                    .unwrap_or(false)
                {
                    Some(index)
                } else {
                    self.index_of_key(key)
                }
            }
        }
    }

    /// Insert `value` at `index`, generating a key when none is supplied.
    /// Returns the entry's key.
    fn insert(&mut self, index: usize, value: V, key: Option<Uuid>) -> Uuid;

    /// Replace the value at `index` (resolved through `key` when supplied),
    /// returning the prior value.
    fn set(&mut self, index: usize, value: V, key: Option<Uuid>) -> Option<V>;

    /// Remove the entry at `index` (resolved through `key` when supplied),
    /// returning the prior value.
    fn remove(&mut self, index: usize, key: Option<Uuid>) -> Option<V>;

    /// Move the entry at `from` (resolved through `key` when supplied) to
    /// `to`. Returns whether an entry moved.
    fn move_entry(&mut self, from: usize, to: usize, key: Option<Uuid>) -> bool;

    /// Discard the first `lower` elements. Returns how many were removed.
    fn drop_prefix(&mut self, lower: usize) -> usize;

    /// Keep the first `upper` elements, discarding the rest. Returns how
    /// many were removed.
    fn take_prefix(&mut self, upper: usize) -> usize;

    /// Discard everything.
    fn clear(&mut self);

    /// A point-in-time copy of all entries.
    fn snapshot(&self) -> Vec<ListEntry<V>>;
}

/// Vec-backed in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryListData<V> {
    entries: Vec<ListEntry<V>>,
}

impl<V> MemoryListData<V> {
    /// Create empty storage.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V: Clone + Send> ListData<V> for MemoryListData<V> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<V> {
        self.entries.get(index).map(|entry| entry.value.clone())
    }

    fn get_entry(&self, index: usize) -> Option<ListEntry<V>> {
        self.entries.get(index).cloned()
    }

    fn index_of_key(&self, key: &Uuid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == *key)
    }

    fn insert(&mut self, index: usize, value: V, key: Option<Uuid>) -> Uuid {
        let key = key.unwrap_or_else(Uuid::new_v4);
        let index = index.min(self.entries.len());
        self.entries.insert(index, ListEntry { key, value });
        key
    }

    fn set(&mut self, index: usize, value: V, key: Option<Uuid>) -> Option<V> {
        let index = self.resolve(index, key.as_ref())?;
        let entry = &mut self.entries[index];
        Some(std::mem::replace(&mut entry.value, value))
    }

    fn remove(&mut self, index: usize, key: Option<Uuid>) -> Option<V> {
        let index = self.resolve(index, key.as_ref())?;
        Some(self.entries.remove(index).value)
    }

    fn move_entry(&mut self, from: usize, to: usize, key: Option<Uuid>) -> bool {
        let from = match self.resolve(from, key.as_ref()) {
            Some(from) => from,
            None => return false,
        };
        if to >= self.entries.len() {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    fn drop_prefix(&mut self, lower: usize) -> usize {
        let removed = lower.min(self.entries.len());
        self.entries.drain(..removed);
        removed
    }

    fn take_prefix(&mut self, upper: usize) -> usize {
        let removed = self.entries.len().saturating_sub(upper);
        self.entries.truncate(upper);
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn snapshot(&self) -> Vec<ListEntry<V>> {
        self.entries.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with(values: &[&str]) -> MemoryListData<String> {
        let mut data = MemoryListData::new();
        for (i, v) in values.iter().enumerate() {
            data.insert(i, v.to_string(), None);
        }
        data
    }

    fn values(data: &MemoryListData<String>) -> Vec<String> {
        data.snapshot().into_iter().map(|e| e.value).collect()
    }

    #[test]
    fn test_insert_set_remove() {
        let mut data = data_with(&["a", "c"]);
        data.insert(1, "b".to_string(), None);
        assert_eq!(values(&data), ["a", "b", "c"]);

        let old = data.set(1, "B".to_string(), None);
        assert_eq!(old.as_deref(), Some("b"));

        let removed = data.remove(1, None);
        assert_eq!(removed.as_deref(), Some("B"));
        assert_eq!(values(&data), ["a", "c"]);
    }

    #[test]
    fn test_keyed_resolution_survives_index_shift() {
        let mut data = data_with(&["a", "b", "c"]);
        let key = data.get_entry(2).unwrap().key;

        // Shift indices by removing the head; the stale index 2 now points
        // at nothing, but the key still resolves.
        data.remove(0, None);
        let removed = data.remove(2, Some(key));
        assert_eq!(removed.as_deref(), Some("c"));
        assert_eq!(values(&data), ["b"]);
    }

    #[test]
    fn test_unknown_key_resolves_nowhere() {
        let mut data = data_with(&["a"]);
        assert!(data.set(0, "x".to_string(), Some(Uuid::new_v4())).is_none());
        assert_eq!(values(&data), ["a"]);
    }

    #[test]
    fn test_move_entry() {
        let mut data = data_with(&["a", "b", "c", "d"]);
        assert!(data.move_entry(0, 2, None));
        assert_eq!(values(&data), ["b", "c", "a", "d"]);
        assert!(!data.move_entry(9, 0, None));
    }

    #[test]
    fn test_drop_and_take_prefix() {
        let mut data = data_with(&["a", "b", "c", "d"]);
        assert_eq!(data.drop_prefix(2), 2);
        assert_eq!(values(&data), ["c", "d"]);

        assert_eq!(data.take_prefix(1), 1);
        assert_eq!(values(&data), ["c"]);

        // Out-of-range bounds clamp rather than erroring.
        assert_eq!(data.drop_prefix(10), 1);
        assert_eq!(data.take_prefix(10), 0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let mut data = data_with(&["a"]);
        let snapshot = data.snapshot();
        data.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(data.is_empty());
    }
}
