//! Heap Manager - garbage-collected heap and object model
//!
//! This component provides:
//! - The closed set of heap object kinds and their trace function
//! - An object-table allocator with free-list reuse and a hard capacity
//! - Incremental mark-and-sweep collection (Idle -> Marking -> Sweeping)
//! - An eager write barrier keeping in-progress marking sound
//! - Persistent root handles for embedder-held references
//! - Collection statistics and tuning knobs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod heap;
pub mod mark_stack;
pub mod object;
pub mod roots;

// Re-export main types
pub use collector::{GcConfig, GcPhase, GcStats};
pub use heap::Heap;
pub use mark_stack::MarkStack;
pub use object::{
    CollectionIterator, HeapData, IterationKind, ObjectCell, ObjectData, ObjectHeader,
    ObjectKind, StringIteratorState,
};
pub use roots::PersistentHandle;
