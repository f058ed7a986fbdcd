//! Core value representation and numeric helpers for the Vesper engine.
//!
//! This crate provides the foundational value layer shared by the heap, the
//! interpreter, and the embedding surface: a NaN-boxed 64-bit tagged value,
//! overflow-checked int32 arithmetic with ECMAScript promotion rules, number
//! formatting, and the engine-wide error type.
//!
//! # Overview
//!
//! - [`TaggedValue`] - One-word encoding of every primitive and heap reference
//! - [`Variant`] - Semantic view of a tagged value for safe decoding
//! - [`Kind`] - Discriminant-only view for cheap kind tests
//! - [`HeapRef`] - Index of a garbage-collected heap cell
//! - [`EngineError`] - Pending-exception signal carried on every fallible path
//!
//! # Examples
//!
//! ```
//! use value_model::{TaggedValue, Variant, add_int32};
//!
//! let v = TaggedValue::encode(Variant::Int32(41));
//! assert_eq!(v.decode(), Variant::Int32(41));
//!
//! // Overflow silently promotes to a double.
//! let sum = add_int32(i32::MAX, 1);
//! assert_eq!(sum.as_double(), Some(2147483648.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod arith;
mod error;
mod number;
mod value;

pub use arith::{add_int32, div_int32, mod_int32, mul_int32, neg_int32, sub_int32};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use number::number_to_string;
pub use value::{HeapRef, Kind, TaggedValue, Variant};
