//! String iterators stepping by Unicode scalar

use heap_manager::{Heap, ObjectKind, StringIteratorState};
use value_model::{EngineError, EngineResult, HeapRef, TaggedValue};

fn is_lead_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_trail_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Creates an iterator over a string's Unicode scalars. The receiver
/// must be a string.
pub fn new_string_iterator(heap: &mut Heap, string: HeapRef) -> EngineResult<HeapRef> {
    let kind = heap.kind_of(string)?;
    if kind != ObjectKind::String {
        return Err(EngineError::type_error(format!(
            "cannot iterate {} as String",
            kind.as_str()
        )));
    }
    heap.alloc_string_iterator(StringIteratorState {
        target: TaggedValue::from_object(string),
        index: 0,
    })
}

/// One step of a string iterator.
///
/// A lead surrogate followed by a trail surrogate advances two code units
/// and yields both as one string; a lone lead surrogate at the end of the
/// string is yielded by itself.
pub(crate) fn string_iterator_next(
    heap: &mut Heap,
    iter: HeapRef,
) -> EngineResult<(TaggedValue, bool)> {
    let mut state = heap.string_iterator_state(iter)?;

    let Some(target) = state.target.as_object() else {
        return Ok((TaggedValue::undefined(), true));
    };

    // Copy out the 1-2 units of this step; the units slice borrows the
    // heap and the allocation below needs it back.
    let step: Option<Vec<u16>> = {
        let units = heap.string_units(target)?;
        let index = state.index as usize;
        if index >= units.len() {
            None
        } else {
            let first = units[index];
            if is_lead_surrogate(first)
                && index + 1 < units.len()
                && is_trail_surrogate(units[index + 1])
            {
                Some(vec![first, units[index + 1]])
            } else {
                Some(vec![first])
            }
        }
    };

    match step {
        None => {
            state.target = TaggedValue::undefined();
            heap.store_string_iterator_state(iter, state)?;
            Ok((TaggedValue::undefined(), true))
        }
        Some(units) => {
            state.index += units.len() as u32;
            let scalar = heap.alloc_string(units)?;
            heap.store_string_iterator_state(iter, state)?;
            Ok((TaggedValue::from_object(scalar), false))
        }
    }
}
