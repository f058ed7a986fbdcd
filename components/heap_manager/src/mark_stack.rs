//! Worklist of objects pending graph traversal during a collection cycle.

use value_model::HeapRef;

/// Mark-phase worklist.
///
/// The heap pushes a reference here at the moment it sets the object's mark
/// bit, so membership is deduplicated by the bit: an object enters the stack
/// at most once per cycle. The stack grows freely while a cycle is active
/// (allocation during marking may push) and is discarded when the cycle
/// completes.
#[derive(Debug, Default)]
pub struct MarkStack {
    entries: Vec<HeapRef>,
}

impl MarkStack {
    /// An empty worklist.
    pub fn new() -> Self {
        MarkStack::default()
    }

    /// Pushes a reference for later tracing.
    pub fn push(&mut self, r: HeapRef) {
        self.entries.push(r);
    }

    /// Pops the next reference to trace.
    pub fn pop(&mut self) -> Option<HeapRef> {
        self.entries.pop()
    }

    /// True when no work remains.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops all pending work at cycle end.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
