//! Array, map, and set iterators

use heap_manager::{CollectionIterator, Heap, IterationKind, ObjectKind};
use value_model::{EngineError, EngineResult, HeapRef, TaggedValue};

use crate::string;

/// Creates an iterator over an array's indexes, values, or index/value
/// pairs. The receiver must be an array.
pub fn new_array_iterator(
    heap: &mut Heap,
    array: HeapRef,
    kind: IterationKind,
) -> EngineResult<HeapRef> {
    expect_kind(heap, array, ObjectKind::Array)?;
    alloc_iterator(heap, ObjectKind::ArrayIterator, array, kind)
}

/// Creates an iterator over a map's keys, values, or entries in insertion
/// order. The receiver must be a map.
pub fn new_map_iterator(
    heap: &mut Heap,
    map: HeapRef,
    kind: IterationKind,
) -> EngineResult<HeapRef> {
    expect_kind(heap, map, ObjectKind::Map)?;
    alloc_iterator(heap, ObjectKind::MapIterator, map, kind)
}

/// Creates an iterator over a set in insertion order. The receiver must
/// be a set.
pub fn new_set_iterator(
    heap: &mut Heap,
    set: HeapRef,
    kind: IterationKind,
) -> EngineResult<HeapRef> {
    expect_kind(heap, set, ObjectKind::Set)?;
    alloc_iterator(heap, ObjectKind::SetIterator, set, kind)
}

fn expect_kind(heap: &Heap, r: HeapRef, expected: ObjectKind) -> EngineResult<()> {
    let actual = heap.kind_of(r)?;
    if actual != expected {
        return Err(EngineError::type_error(format!(
            "cannot iterate {} as {}",
            actual.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}

fn alloc_iterator(
    heap: &mut Heap,
    iterator_kind: ObjectKind,
    target: HeapRef,
    kind: IterationKind,
) -> EngineResult<HeapRef> {
    heap.alloc_collection_iterator(
        iterator_kind,
        CollectionIterator {
            target: TaggedValue::from_object(target),
            index: 0,
            kind,
        },
    )
}

/// Advances any iterator one step, returning the element and the done
/// flag. The caller shapes these into a result object.
///
/// Once the backing reference has been cleared the iterator is terminal:
/// every further call returns `(undefined, true)` without touching the
/// collection. A non-iterator receiver raises a `TypeError`.
pub fn iterator_next(heap: &mut Heap, iter: HeapRef) -> EngineResult<(TaggedValue, bool)> {
    match heap.kind_of(iter)? {
        ObjectKind::ArrayIterator | ObjectKind::MapIterator | ObjectKind::SetIterator => {
            collection_next(heap, iter)
        }
        ObjectKind::StringIterator => string::string_iterator_next(heap, iter),
        other => Err(EngineError::type_error(format!(
            "{} is not an iterator",
            other.as_str()
        ))),
    }
}

fn collection_next(heap: &mut Heap, iter: HeapRef) -> EngineResult<(TaggedValue, bool)> {
    let iterator_kind = heap.kind_of(iter)?;
    let mut state = heap.collection_iterator_state(iter)?;

    // Cleared backing reference: terminal forever.
    let Some(target) = state.target.as_object() else {
        return Ok((TaggedValue::undefined(), true));
    };

    // The length is re-read every step, so growth during iteration is
    // observed and shrinkage ends the iteration.
    let len = match iterator_kind {
        ObjectKind::ArrayIterator => heap.array_length(target)?,
        ObjectKind::MapIterator => heap.map_size(target)?,
        _ => heap.set_size(target)?,
    };
    if state.index >= len {
        state.target = TaggedValue::undefined();
        heap.store_collection_iterator_state(iter, state)?;
        return Ok((TaggedValue::undefined(), true));
    }

    let element = fetch_element(heap, iterator_kind, target, state.index, state.kind)?;
    state.index += 1;
    heap.store_collection_iterator_state(iter, state)?;
    Ok((element, false))
}

fn fetch_element(
    heap: &mut Heap,
    iterator_kind: ObjectKind,
    target: HeapRef,
    index: u32,
    kind: IterationKind,
) -> EngineResult<TaggedValue> {
    match iterator_kind {
        ObjectKind::ArrayIterator => {
            let value = heap.array_get(target, index)?;
            match kind {
                IterationKind::Keys => Ok(TaggedValue::from_int32(index as i32)),
                IterationKind::Values => Ok(value),
                IterationKind::Entries => {
                    entry_pair(heap, TaggedValue::from_int32(index as i32), value)
                }
            }
        }
        ObjectKind::MapIterator => {
            let (key, value) = heap.map_entry_at(target, index)?.ok_or_else(|| {
                EngineError::internal(format!("map entry {index} vanished mid-iteration"))
            })?;
            match kind {
                IterationKind::Keys => Ok(key),
                IterationKind::Values => Ok(value),
                IterationKind::Entries => entry_pair(heap, key, value),
            }
        }
        _ => {
            let value = heap.set_value_at(target, index)?.ok_or_else(|| {
                EngineError::internal(format!("set value {index} vanished mid-iteration"))
            })?;
            match kind {
                IterationKind::Keys | IterationKind::Values => Ok(value),
                // Sets have no keys; the element fills both slots.
                IterationKind::Entries => entry_pair(heap, value, value),
            }
        }
    }
}

fn entry_pair(heap: &mut Heap, key: TaggedValue, value: TaggedValue) -> EngineResult<TaggedValue> {
    let pair = heap.alloc_array(vec![key, value])?;
    Ok(TaggedValue::from_object(pair))
}
