//! Contract tests for the iteration protocol surface

use heap_manager::{Heap, IterationKind};
use iterator_objects::{
    create_iter_result_object, iterator_next, new_array_iterator, new_map_iterator,
    new_set_iterator, new_string_iterator,
};
use value_model::{ErrorKind, TaggedValue};

/// Test the result object contract: exactly the two data properties
/// `value` and `done`, defined in that order.
#[test]
fn test_result_object_contract() {
    let mut heap = Heap::new();
    let result = create_iter_result_object(&mut heap, TaggedValue::from_int32(9), false).unwrap();

    let names = heap.object_property_names(result).unwrap();
    assert_eq!(
        names,
        vec!["value".to_string(), "done".to_string()],
        "result objects should define value before done"
    );
    assert_eq!(
        heap.object_get_property(result, "value").unwrap().as_int32(),
        Some(9)
    );
    assert_eq!(
        heap.object_get_property(result, "done").unwrap().as_bool(),
        Some(false)
    );
}

/// Test the step-count contract: a three-element collection answers
/// exactly three value steps and then a done step.
#[test]
fn test_three_elements_four_steps_contract() {
    let mut heap = Heap::new();
    let array = heap
        .alloc_array(vec![
            TaggedValue::from_int32(10),
            TaggedValue::from_int32(20),
            TaggedValue::from_int32(30),
        ])
        .unwrap();
    let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();

    for expected in [10, 20, 30] {
        let (value, done) = iterator_next(&mut heap, iter).unwrap();
        assert_eq!(value.as_int32(), Some(expected));
        assert!(!done, "element steps should not report done");
    }
    let (value, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(value.is_undefined());
    assert!(done, "the fourth step should report completion");
}

/// Test the terminal-state contract: once an iterator reports done it
/// answers `undefined, true` forever, even if the collection grows.
#[test]
fn test_terminal_state_idempotence_contract() {
    let mut heap = Heap::new();
    let set = heap.alloc_set().unwrap();
    heap.set_add(set, TaggedValue::from_int32(1)).unwrap();
    let iter = new_set_iterator(&mut heap, set, IterationKind::Values).unwrap();

    let (_, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(!done);
    let (_, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(done);

    heap.set_add(set, TaggedValue::from_int32(2)).unwrap();
    for _ in 0..3 {
        let (value, done) = iterator_next(&mut heap, iter).unwrap();
        assert!(value.is_undefined(), "terminal steps should yield undefined");
        assert!(done, "a finished iterator should stay finished");
    }
}

/// Test the set entry contract: entries iteration yields two-element
/// arrays with the element in both slots.
#[test]
fn test_set_entries_duplication_contract() {
    let mut heap = Heap::new();
    let set = heap.alloc_set().unwrap();
    heap.set_add(set, TaggedValue::from_int32(42)).unwrap();
    let iter = new_set_iterator(&mut heap, set, IterationKind::Entries).unwrap();

    let (entry, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(!done);
    let pair = entry.as_object().unwrap();
    assert_eq!(heap.array_length(pair).unwrap(), 2);
    assert_eq!(heap.array_get(pair, 0).unwrap().as_int32(), Some(42));
    assert_eq!(heap.array_get(pair, 1).unwrap().as_int32(), Some(42));
}

/// Test the string stepping contract: a surrogate pair is one step and
/// a lone lead surrogate at the end of the string steps alone.
#[test]
fn test_string_surrogate_contract() {
    let mut heap = Heap::new();
    // U+1F600 followed by a lead surrogate with nothing after it.
    let s = heap.alloc_string(vec![0xD83D, 0xDE00, 0xD83D]).unwrap();
    let iter = new_string_iterator(&mut heap, s).unwrap();

    let (first, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(!done);
    let first_units = heap
        .string_units(first.as_object().unwrap())
        .unwrap()
        .to_vec();
    assert_eq!(first_units, vec![0xD83D, 0xDE00], "paired units step together");

    let (second, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(!done);
    let second_units = heap
        .string_units(second.as_object().unwrap())
        .unwrap()
        .to_vec();
    assert_eq!(second_units, vec![0xD83D], "an unpaired lead steps alone");

    let (_, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(done);
}

/// Test the receiver contract: iterator constructors reject collections
/// of the wrong kind and `iterator_next` rejects non-iterators, both
/// with type errors.
#[test]
fn test_receiver_kind_contract() {
    let mut heap = Heap::new();
    let map = heap.alloc_map().unwrap();
    let array = heap.alloc_array(vec![]).unwrap();
    let plain = heap.alloc_object().unwrap();

    let err = new_array_iterator(&mut heap, map, IterationKind::Values).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    let err = new_map_iterator(&mut heap, array, IterationKind::Entries).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    let err = new_string_iterator(&mut heap, plain).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);

    let err = iterator_next(&mut heap, plain).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

/// Test the live-view contract: elements appended behind the cursor
/// during iteration are visited before the iterator completes.
#[test]
fn test_growth_visibility_contract() {
    let mut heap = Heap::new();
    let array = heap.alloc_array(vec![TaggedValue::from_int32(1)]).unwrap();
    let iter = new_array_iterator(&mut heap, array, IterationKind::Values).unwrap();

    let (value, _) = iterator_next(&mut heap, iter).unwrap();
    assert_eq!(value.as_int32(), Some(1));

    heap.array_push(array, TaggedValue::from_int32(2)).unwrap();
    let (value, done) = iterator_next(&mut heap, iter).unwrap();
    assert_eq!(value.as_int32(), Some(2), "appended elements should be seen");
    assert!(!done);

    let (_, done) = iterator_next(&mut heap, iter).unwrap();
    assert!(done);
}
