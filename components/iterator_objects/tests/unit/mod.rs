//! Unit tests for iterator_objects components

use heap_manager::{Heap, IterationKind};
use iterator_objects::{
    create_iter_result_object, iterator_next, new_array_iterator, new_map_iterator,
    new_set_iterator, new_string_iterator,
};
use value_model::TaggedValue;

/// Takes one protocol step and shapes it as a result object, the way the
/// interpreter's IteratorNext does.
fn next_result_object(heap: &mut Heap, iter: value_model::HeapRef) -> value_model::HeapRef {
    let (value, done) = iterator_next(heap, iter).unwrap();
    create_iter_result_object(heap, value, done).unwrap()
}

// ============================================================================
// Result Object Protocol Tests
// ============================================================================

#[test]
fn test_result_objects_shape_every_step() {
    let mut heap = Heap::new();
    let array = heap
        .alloc_array(vec![TaggedValue::from_int32(1), TaggedValue::from_int32(2)])
        .unwrap();
    let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();

    for expected in [Some(1), Some(2), None] {
        let result = next_result_object(&mut heap, iter);
        let names = heap.object_property_names(result).unwrap();
        assert_eq!(names, vec!["value".to_string(), "done".to_string()]);

        let value = heap.object_get_property(result, "value").unwrap();
        let done = heap.object_get_property(result, "done").unwrap();
        match expected {
            Some(n) => {
                assert_eq!(value.as_int32(), Some(n));
                assert_eq!(done.as_bool(), Some(false));
            }
            None => {
                assert!(value.is_undefined());
                assert_eq!(done.as_bool(), Some(true));
            }
        }
    }
}

// ============================================================================
// Cross-Kind Iteration Tests
// ============================================================================

#[test]
fn test_map_keys_values_entries_agree() {
    let mut heap = Heap::new();
    let map = heap.alloc_map().unwrap();
    let key = heap.alloc_string_from_str("k").unwrap();
    heap.map_set(
        map,
        TaggedValue::from_object(key),
        TaggedValue::from_int32(7),
    )
    .unwrap();

    let keys = new_map_iterator(&mut heap, map, IterationKind::Keys).unwrap();
    let values = new_map_iterator(&mut heap, map, IterationKind::Values).unwrap();
    let entries = new_map_iterator(&mut heap, map, IterationKind::Entries).unwrap();

    let (k, _) = iterator_next(&mut heap, keys).unwrap();
    let (v, _) = iterator_next(&mut heap, values).unwrap();
    let (e, _) = iterator_next(&mut heap, entries).unwrap();

    assert_eq!(k.as_object(), Some(key));
    assert_eq!(v.as_int32(), Some(7));
    let pair = e.as_object().unwrap();
    assert_eq!(heap.array_get(pair, 0).unwrap().as_object(), Some(key));
    assert_eq!(heap.array_get(pair, 1).unwrap().as_int32(), Some(7));
}

#[test]
fn test_independent_iterators_do_not_share_cursors() {
    let mut heap = Heap::new();
    let set = heap.alloc_set().unwrap();
    heap.set_add(set, TaggedValue::from_int32(1)).unwrap();
    heap.set_add(set, TaggedValue::from_int32(2)).unwrap();

    let first = new_set_iterator(&mut heap, set, IterationKind::Values).unwrap();
    let second = new_set_iterator(&mut heap, set, IterationKind::Values).unwrap();

    let (a, _) = iterator_next(&mut heap, first).unwrap();
    let (b, _) = iterator_next(&mut heap, second).unwrap();
    assert_eq!(a.as_int32(), Some(1));
    assert_eq!(b.as_int32(), Some(1), "each iterator owns its cursor");
}

#[test]
fn test_string_iteration_mixed_content() {
    let mut heap = Heap::new();
    // "a" + U+1F600 + "b"
    let s = heap
        .alloc_string(vec![0x61, 0xD83D, 0xDE00, 0x62])
        .unwrap();
    let iter = new_string_iterator(&mut heap, s).unwrap();

    let mut lengths = Vec::new();
    loop {
        let (value, done) = iterator_next(&mut heap, iter).unwrap();
        if done {
            break;
        }
        let step = value.as_object().unwrap();
        lengths.push(heap.string_length(step).unwrap());
    }
    assert_eq!(lengths, vec![1, 2, 1]);
}

// ============================================================================
// Garbage Collection Interaction Tests
// ============================================================================

#[test]
fn test_iterator_roots_its_backing_collection() {
    let mut heap = Heap::new();
    let array = heap.alloc_array(vec![TaggedValue::from_int32(3)]).unwrap();
    let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();

    // Only the iterator is a root; the array must survive through it.
    heap.collect_full(&[TaggedValue::from_object(iter)]);
    assert!(heap.contains(array));

    let (value, done) = iterator_next(&mut heap, iter).unwrap();
    assert_eq!(value.as_int32(), Some(3));
    assert!(!done);
}

#[test]
fn test_exhausted_iterator_releases_its_collection() {
    let mut heap = Heap::new();
    let array = heap.alloc_array(vec![]).unwrap();
    let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();

    let (_, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(done);

    // The terminal iterator no longer references the array.
    heap.collect_full(&[TaggedValue::from_object(iter)]);
    assert!(!heap.contains(array));
    assert!(heap.contains(iter));
}
