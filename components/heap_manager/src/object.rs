//! Heap object model.
//!
//! Every garbage-collected cell is one [`HeapData`] variant behind a common
//! [`ObjectHeader`] (kind tag plus mark bit). The collector discovers
//! outgoing references through [`HeapData::trace`], a single exhaustive
//! match; adding a variant without extending the match is a compile error,
//! so no reference-bearing field can be forgotten.

use value_model::{HeapRef, TaggedValue};

/// Kind tag stored in every object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Plain object with named properties
    Object,
    /// Dense array
    Array,
    /// UTF-16 string
    String,
    /// Insertion-ordered key/value map
    Map,
    /// Insertion-ordered set
    Set,
    /// Iterator over an array
    ArrayIterator,
    /// Iterator over a map
    MapIterator,
    /// Iterator over a set
    SetIterator,
    /// Iterator over a string's scalar values
    StringIterator,
    /// Native function registered by the embedding
    HostFunction,
}

impl ObjectKind {
    /// Human-readable kind name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Object => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::String => "String",
            ObjectKind::Map => "Map",
            ObjectKind::Set => "Set",
            ObjectKind::ArrayIterator => "Array Iterator",
            ObjectKind::MapIterator => "Map Iterator",
            ObjectKind::SetIterator => "Set Iterator",
            ObjectKind::StringIterator => "String Iterator",
            ObjectKind::HostFunction => "Function",
        }
    }
}

/// Which projection a collection iterator's `next()` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    /// Keys only (array indexes, map keys, set elements)
    Keys,
    /// Values only
    Values,
    /// `[key, value]` pair arrays
    Entries,
}

/// Mutable state of an array, map, or set iterator.
#[derive(Debug, Clone, Copy)]
pub struct CollectionIterator {
    /// Backing collection. Cleared to undefined when iteration finishes;
    /// a cleared target is the permanent terminal state.
    pub target: TaggedValue,
    /// Position of the next element.
    pub index: u32,
    /// Projection returned by `next()`.
    pub kind: IterationKind,
}

/// Mutable state of a string iterator. The index is a code-unit position;
/// stepping is by Unicode scalar value.
#[derive(Debug, Clone, Copy)]
pub struct StringIteratorState {
    /// Backing string, cleared to undefined once exhausted.
    pub target: TaggedValue,
    /// Code-unit position of the next step.
    pub index: u32,
}

/// Property storage and prototype link of a plain object.
///
/// Properties are kept in creation order; result-object shapes and
/// enumeration depend on it.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    /// Own properties in creation order.
    pub properties: Vec<(String, TaggedValue)>,
    /// Optional prototype link followed on property reads.
    pub prototype: Option<HeapRef>,
}

impl ObjectData {
    /// An empty object with no prototype.
    pub fn new() -> Self {
        ObjectData::default()
    }

    /// Reads an own property.
    pub fn get(&self, name: &str) -> Option<TaggedValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, value)| value)
    }

    /// Creates or updates a property. Updates keep the original position;
    /// new properties append.
    pub fn set(&mut self, name: &str, value: TaggedValue) {
        if let Some(slot) = self.properties.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value;
        } else {
            self.properties.push((name.to_string(), value));
        }
    }
}

/// Header every heap cell carries.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    /// Kind tag, fixed at allocation.
    pub kind: ObjectKind,
    /// Mark bit; doubles as the "already pushed this cycle" flag.
    pub marked: bool,
}

/// One garbage-collected cell: header plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct ObjectCell {
    /// Collector-facing header.
    pub header: ObjectHeader,
    /// Kind-specific payload.
    pub data: HeapData,
}

impl ObjectCell {
    /// Wraps a payload in a cell, deriving the header kind tag.
    pub fn new(data: HeapData, marked: bool) -> Self {
        ObjectCell {
            header: ObjectHeader {
                kind: data.kind(),
                marked,
            },
            data,
        }
    }
}

/// The closed set of heap object payloads.
#[derive(Debug, Clone)]
pub enum HeapData {
    /// Plain object
    Object(ObjectData),
    /// Dense array of values
    Array(Vec<TaggedValue>),
    /// UTF-16 code units; lone surrogates are representable
    String(Vec<u16>),
    /// Insertion-ordered entries
    Map(Vec<(TaggedValue, TaggedValue)>),
    /// Insertion-ordered distinct values
    Set(Vec<TaggedValue>),
    /// Array iterator state
    ArrayIterator(CollectionIterator),
    /// Map iterator state
    MapIterator(CollectionIterator),
    /// Set iterator state
    SetIterator(CollectionIterator),
    /// String iterator state
    StringIterator(StringIteratorState),
    /// Host function, dispatched by registry name
    HostFunction(String),
}

impl HeapData {
    /// The header kind tag for this payload.
    pub fn kind(&self) -> ObjectKind {
        match self {
            HeapData::Object(_) => ObjectKind::Object,
            HeapData::Array(_) => ObjectKind::Array,
            HeapData::String(_) => ObjectKind::String,
            HeapData::Map(_) => ObjectKind::Map,
            HeapData::Set(_) => ObjectKind::Set,
            HeapData::ArrayIterator(_) => ObjectKind::ArrayIterator,
            HeapData::MapIterator(_) => ObjectKind::MapIterator,
            HeapData::SetIterator(_) => ObjectKind::SetIterator,
            HeapData::StringIterator(_) => ObjectKind::StringIterator,
            HeapData::HostFunction(_) => ObjectKind::HostFunction,
        }
    }

    /// Visits every outgoing heap reference exactly once.
    pub fn trace<F: FnMut(HeapRef)>(&self, mut visit: F) {
        fn value_ref<F: FnMut(HeapRef)>(value: TaggedValue, visit: &mut F) {
            if let Some(r) = value.as_object() {
                visit(r);
            }
        }
        match self {
            HeapData::Object(data) => {
                for &(_, value) in &data.properties {
                    value_ref(value, &mut visit);
                }
                if let Some(proto) = data.prototype {
                    visit(proto);
                }
            }
            HeapData::Array(elements) => {
                for &value in elements {
                    value_ref(value, &mut visit);
                }
            }
            HeapData::String(_) | HeapData::HostFunction(_) => {}
            HeapData::Map(entries) => {
                for &(key, value) in entries {
                    value_ref(key, &mut visit);
                    value_ref(value, &mut visit);
                }
            }
            HeapData::Set(values) => {
                for &value in values {
                    value_ref(value, &mut visit);
                }
            }
            HeapData::ArrayIterator(state)
            | HeapData::MapIterator(state)
            | HeapData::SetIterator(state) => value_ref(state.target, &mut visit),
            HeapData::StringIterator(state) => value_ref(state.target, &mut visit),
        }
    }
}
