//! Iterator protocol over heap collections
//!
//! This crate provides the `next() -> {value, done}` contract for the four
//! iterable heap kinds: arrays, maps, sets, and strings.
//!
//! # Features
//!
//! - One shared result-object constructor, so every iterator produces the
//!   same `{value, done}` shape
//! - Idempotent terminal state: once exhausted, an iterator never re-reads
//!   its backing collection
//! - Key/value/entry iteration kinds for collections
//! - Unicode-scalar stepping for strings, surrogate pairs taken as one step
//!
//! # Example
//!
//! ```
//! use heap_manager::{Heap, IterationKind};
//! use iterator_objects::{iterator_next, new_array_iterator};
//! use value_model::TaggedValue;
//!
//! let mut heap = Heap::new();
//! let array = heap.alloc_array(vec![TaggedValue::from_int32(7)]).unwrap();
//! let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();
//!
//! let (value, done) = iterator_next(&mut heap, iter).unwrap();
//! assert_eq!(value.as_int32(), Some(7));
//! assert!(!done);
//! let (_, done) = iterator_next(&mut heap, iter).unwrap();
//! assert!(done);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod result;
pub mod string;

// Re-export main entry points at crate root
pub use collection::{iterator_next, new_array_iterator, new_map_iterator, new_set_iterator};
pub use result::create_iter_result_object;
pub use string::new_string_iterator;
