//! Reference registry pinning heap objects against collection
//!
//! Every heap object referenced from the host through a proxy is registered
//! here with a liveness count. The collector treats every registered id as a
//! root, so an object is eligible for collection exactly when it has no
//! count and is unreachable from the runtime's own globals.

use indexmap::IndexMap;

use crate::heap::ObjectId;

/// Host-held liveness counts, keyed by object identity.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    counts: IndexMap<ObjectId, usize>,
}

impl ReferenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one reference to `id` and return the new count.
    pub fn pin(&mut self, id: ObjectId) -> usize {
        let count = self.counts.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    /// Release one reference to `id`.
    ///
    /// Returns the remaining count, or `None` if `id` was not registered.
    /// The entry is removed when the count reaches zero.
    pub fn unpin(&mut self, id: ObjectId) -> Option<usize> {
        let count = self.counts.get_mut(&id)?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.counts.swap_remove(&id);
        }
        Some(remaining)
    }

    /// Current count for `id` (zero when unregistered).
    pub fn count(&self, id: ObjectId) -> usize {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Whether `id` is pinned.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.counts.contains_key(&id)
    }

    /// All pinned ids (collector roots).
    pub fn pinned(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.counts.keys().copied()
    }

    /// Number of distinct pinned objects.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Opaque key returned by `Runtime::create_reference`.
///
/// A key must be handed back to `Runtime::free_reference` exactly once. It
/// cannot be cloned; a second reference needs a second `create_reference`.
/// Values that live inline (numbers, strings, functions) need no pin and get
/// an empty key.
#[must_use = "a reference key must be released with `free_reference`"]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PinKey(Option<ObjectId>);

impl PinKey {
    pub(crate) fn pinned(id: ObjectId) -> Self {
        Self(Some(id))
    }

    pub(crate) fn inline() -> Self {
        Self(None)
    }

    /// The pinned object, if the key pins anything.
    pub fn id(&self) -> Option<ObjectId> {
        self.0
    }

    /// Whether this key holds a registry entry.
    pub fn is_pinned(&self) -> bool {
        self.0.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, HeapObject};

    fn ids(n: usize) -> Vec<ObjectId> {
        let mut heap = Heap::new();
        (0..n).map(|_| heap.alloc(HeapObject::Array(vec![]))).collect()
    }

    #[test]
    fn test_pin_counts_up() {
        let id = ids(1)[0];
        let mut reg = ReferenceRegistry::new();
        assert_eq!(reg.pin(id), 1);
        assert_eq!(reg.pin(id), 2);
        assert_eq!(reg.count(id), 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unpin_removes_at_zero() {
        let id = ids(1)[0];
        let mut reg = ReferenceRegistry::new();
        reg.pin(id);
        reg.pin(id);
        assert_eq!(reg.unpin(id), Some(1));
        assert!(reg.contains(id));
        assert_eq!(reg.unpin(id), Some(0));
        assert!(!reg.contains(id));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unpin_unregistered() {
        let id = ids(1)[0];
        let mut reg = ReferenceRegistry::new();
        assert_eq!(reg.unpin(id), None);
        assert_eq!(reg.count(id), 0);
    }

    #[test]
    fn test_pinned_iterates_distinct_ids() {
        let all = ids(3);
        let mut reg = ReferenceRegistry::new();
        for id in &all {
            reg.pin(*id);
        }
        reg.pin(all[0]);
        let mut pinned: Vec<_> = reg.pinned().collect();
        pinned.sort();
        assert_eq!(pinned, all);
    }
}
