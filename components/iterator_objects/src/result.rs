//! Iterator result objects

use heap_manager::Heap;
use value_model::{EngineResult, HeapRef, TaggedValue};

/// Allocates a `{value, done}` result object.
///
/// Every iterator kind funnels through here so the result shape cannot
/// diverge: exactly two own properties, `value` created first, `done`
/// second.
pub fn create_iter_result_object(
    heap: &mut Heap,
    value: TaggedValue,
    done: bool,
) -> EngineResult<HeapRef> {
    let obj = heap.alloc_object()?;
    heap.object_set_property(obj, "value", value)?;
    heap.object_set_property(obj, "done", TaggedValue::from_bool(done))?;
    Ok(obj)
}
