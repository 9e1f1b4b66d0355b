//! Garbage-collected object heap
//!
//! A non-moving mark/sweep heap. Objects live in a `Vec` of slots; an
//! [`ObjectId`] stores the slot index plus a per-slot generation, so handles
//! stay stable across reallocation and stale handles are detected once a slot
//! has been swept and reused. Every heap also stamps its ids, so an id from
//! another heap never resolves here.
//!
//! The heap knows nothing about where its roots come from. The runtime hands
//! `collect` the global bindings, the pinned ids of the reference registry,
//! and whatever result is in flight at the safe point.

use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;

use crate::value::{HashableValue, StructValue, Value};

/// Identity of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    heap: u32,
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Slot index (stable for the object's lifetime)
    pub fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at allocation time
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A heap-resident container.
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// Growable, mutable array
    Array(Vec<Value>),

    /// Fixed, immutable tuple
    Tuple(Vec<Value>),

    /// Struct instance (mutable unless frozen)
    Struct(StructValue),

    /// Insertion-ordered dictionary with primitive keys
    Dict(IndexMap<HashableValue, Value>),
}

impl HeapObject {
    /// Foreign-side type name
    pub fn type_name(&self) -> &str {
        match self {
            HeapObject::Array(_) => "Array",
            HeapObject::Tuple(_) => "Tuple",
            HeapObject::Struct(s) => &s.type_name,
            HeapObject::Dict(_) => "Dict",
        }
    }

    /// Whether the object's contents may be replaced in place.
    pub fn is_mutable(&self) -> bool {
        match self {
            HeapObject::Array(_) | HeapObject::Dict(_) => true,
            HeapObject::Struct(s) => !s.frozen,
            HeapObject::Tuple(_) => false,
        }
    }

    /// Number of elements or fields
    pub fn len(&self) -> usize {
        match self {
            HeapObject::Array(items) | HeapObject::Tuple(items) => items.len(),
            HeapObject::Struct(s) => s.fields.len(),
            HeapObject::Dict(map) => map.len(),
        }
    }

    /// Whether the object has no elements or fields
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn trace(&self, worklist: &mut Vec<ObjectId>) {
        let children: Box<dyn Iterator<Item = &Value>> = match self {
            HeapObject::Array(items) | HeapObject::Tuple(items) => Box::new(items.iter()),
            HeapObject::Struct(s) => Box::new(s.fields.values()),
            HeapObject::Dict(map) => Box::new(map.values()),
        };
        worklist.extend(children.filter_map(Value::object_id));
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<HeapObject>,
}

/// Counters describing heap occupancy and collector activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Objects currently allocated
    pub live_objects: usize,
    /// Slots ever created (live + free)
    pub capacity: usize,
    /// Completed collections
    pub gc_runs: u64,
    /// Allocations since the last collection
    pub allocations_since_gc: usize,
    /// Objects freed by the last collection
    pub last_freed: usize,
}

static NEXT_HEAP_STAMP: AtomicU32 = AtomicU32::new(1);

/// The object heap.
#[derive(Debug)]
pub struct Heap {
    stamp: u32,
    slots: Vec<Slot>,
    marks: Vec<bool>,
    free_list: Vec<u32>,
    worklist: Vec<ObjectId>,
    live: usize,
    allocations_since_gc: usize,
    gc_runs: u64,
    last_freed: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            stamp: NEXT_HEAP_STAMP.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            marks: Vec::new(),
            free_list: Vec::new(),
            worklist: Vec::new(),
            live: 0,
            allocations_since_gc: 0,
            gc_runs: 0,
            last_freed: 0,
        }
    }

    fn owns(&self, id: ObjectId) -> bool {
        id.heap == self.stamp
    }

    /// Allocate an object and return its handle.
    pub fn alloc(&mut self, object: HeapObject) -> ObjectId {
        self.live += 1;
        self.allocations_since_gc += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.object.is_none(), "free list points at a live slot");
            slot.object = Some(object);
            return ObjectId {
                heap: self.stamp,
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        self.marks.push(false);
        ObjectId {
            heap: self.stamp,
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| self.owns(id) && slot.generation == id.generation)
    }

    /// Look up a live object.
    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.slot(id).and_then(|slot| slot.object.as_ref())
    }

    /// Look up a live object for mutation.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        if !self.owns(id) {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_mut())
    }

    /// Whether `id` still names an allocated object.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Number of allocated objects.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Allocations since the last collection.
    pub fn allocations_since_gc(&self) -> usize {
        self.allocations_since_gc
    }

    /// Snapshot of the heap counters.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.live,
            capacity: self.slots.len(),
            gc_runs: self.gc_runs,
            allocations_since_gc: self.allocations_since_gc,
            last_freed: self.last_freed,
        }
    }

    /// Mark everything reachable from `roots`, then sweep the rest.
    ///
    /// Returns the number of objects freed.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = ObjectId>) -> usize {
        self.gc_runs += 1;

        // Mark.
        self.worklist.clear();
        self.worklist.extend(roots);
        while let Some(id) = self.worklist.pop() {
            if !self.owns(id) {
                continue;
            }
            let idx = id.index as usize;
            let Some(slot) = self.slots.get(idx) else {
                continue;
            };
            if slot.generation != id.generation || self.marks[idx] {
                continue;
            }
            let Some(object) = slot.object.as_ref() else {
                continue;
            };
            self.marks[idx] = true;
            object.trace(&mut self.worklist);
        }

        // Sweep.
        let mut freed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let marked = std::mem::replace(&mut self.marks[idx], false);
            if marked || slot.object.is_none() {
                continue;
            }
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(idx as u32);
            freed += 1;
        }

        self.live -= freed;
        self.last_freed = freed;
        self.allocations_since_gc = 0;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(items: Vec<Value>) -> HeapObject {
        HeapObject::Array(items)
    }

    #[test]
    fn test_alloc_and_get() {
        let mut heap = Heap::new();
        let id = heap.alloc(array(vec![Value::I64(1)]));
        assert!(heap.is_live(id));
        assert_eq!(heap.get(id).map(HeapObject::len), Some(1));
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_ids_do_not_resolve_in_another_heap() {
        let mut first = Heap::new();
        let mut second = Heap::new();
        let id = first.alloc(array(vec![Value::I64(1)]));
        second.alloc(array(vec![Value::I64(2)]));
        assert_eq!(id.index(), 0);
        assert!(!second.is_live(id));
        assert!(second.get_mut(id).is_none());
        assert_eq!(second.collect([id]), 1);
    }

    #[test]
    fn test_collect_frees_unrooted() {
        let mut heap = Heap::new();
        let kept = heap.alloc(array(vec![]));
        let dropped = heap.alloc(array(vec![]));

        let freed = heap.collect([kept]);
        assert_eq!(freed, 1);
        assert!(heap.is_live(kept));
        assert!(!heap.is_live(dropped));
    }

    #[test]
    fn test_collect_traces_children() {
        let mut heap = Heap::new();
        let inner = heap.alloc(array(vec![Value::I64(7)]));
        let outer = heap.alloc(HeapObject::Tuple(vec![Value::Object(inner)]));

        heap.collect([outer]);
        assert!(heap.is_live(inner));
    }

    #[test]
    fn test_cycles_are_collected() {
        let mut heap = Heap::new();
        let a = heap.alloc(array(vec![]));
        let b = heap.alloc(array(vec![Value::Object(a)]));
        if let Some(HeapObject::Array(items)) = heap.get_mut(a) {
            items.push(Value::Object(b));
        }

        assert_eq!(heap.collect([]), 2);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut heap = Heap::new();
        let old = heap.alloc(array(vec![]));
        heap.collect([]);
        let new = heap.alloc(array(vec![]));

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(heap.get(old).is_none());
        assert!(heap.is_live(new));
    }

    #[test]
    fn test_stats_track_runs() {
        let mut heap = Heap::new();
        heap.alloc(array(vec![]));
        heap.collect([]);
        let stats = heap.stats();
        assert_eq!(stats.gc_runs, 1);
        assert_eq!(stats.last_freed, 1);
        assert_eq!(stats.allocations_since_gc, 0);
    }

    #[test]
    fn test_frozen_struct_is_immutable() {
        let s = HeapObject::Struct(StructValue::new("P").frozen());
        assert!(!s.is_mutable());
        assert!(!HeapObject::Tuple(vec![]).is_mutable());
        assert!(HeapObject::Dict(IndexMap::new()).is_mutable());
    }
}
