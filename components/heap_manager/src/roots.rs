//! Persistent GC roots for embedder-held references.
//!
//! Native code holding a heap reference across allocations must register it,
//! or a collection cycle may reclaim the object underneath it. A
//! [`PersistentHandle`] keeps its value rooted until dropped; the collector
//! scans the table at cycle start and again before sweep.

use std::cell::RefCell;
use std::rc::Rc;

use value_model::TaggedValue;

/// Slab of registered root values. Shared between the heap and the handles
/// it hands out.
#[derive(Debug, Default)]
pub(crate) struct RootTable {
    slots: Vec<Option<TaggedValue>>,
    free: Vec<usize>,
}

impl RootTable {
    pub(crate) fn insert(&mut self, value: TaggedValue) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    pub(crate) fn release(&mut self, id: usize) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = None;
            self.free.push(id);
        }
    }

    pub(crate) fn values(&self) -> Vec<TaggedValue> {
        self.slots.iter().flatten().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

/// A registered GC root, released on drop.
///
/// The handle pins the value it was created with; it does not track later
/// mutation. Re-create the handle to root a different value.
#[derive(Debug)]
pub struct PersistentHandle {
    id: usize,
    value: TaggedValue,
    table: Rc<RefCell<RootTable>>,
}

impl PersistentHandle {
    pub(crate) fn new(table: Rc<RefCell<RootTable>>, value: TaggedValue) -> Self {
        let id = table.borrow_mut().insert(value);
        PersistentHandle { id, value, table }
    }

    /// The rooted value.
    pub fn value(&self) -> TaggedValue {
        self.value
    }
}

impl Drop for PersistentHandle {
    fn drop(&mut self) {
        self.table.borrow_mut().release(self.id);
    }
}
