//! Contract tests for heap_manager API
//!
//! These tests verify the public API matches the contract specification.

use heap_manager::{GcConfig, GcPhase, Heap, ObjectKind};
use value_model::{ErrorKind, TaggedValue};

/// Test Heap::new() returns an empty idle heap
#[test]
fn test_heap_new_contract() {
    let heap = Heap::new();
    assert_eq!(heap.live_count(), 0, "new heap should be empty");
    assert_eq!(heap.phase(), GcPhase::Idle, "new heap should be idle");
    assert!(!heap.gc_ongoing());
}

/// Test Heap::alloc_*() returns references resolvable through get()
#[test]
fn test_heap_alloc_contract() {
    let mut heap = Heap::new();
    let r = heap.alloc_object().unwrap();
    assert!(heap.contains(r), "allocated cell should be live");
    let cell = heap.get(r);
    assert!(cell.is_ok(), "get should resolve a live reference");
    assert_eq!(cell.unwrap().header.kind, ObjectKind::Object);
}

/// Test allocation failure at capacity is an InternalError, not a panic
#[test]
fn test_heap_capacity_failure_contract() {
    let mut heap = Heap::with_config(GcConfig {
        max_objects: 1,
        ..GcConfig::default()
    });
    heap.alloc_object().unwrap();
    let err = heap.alloc_object();
    assert!(err.is_err(), "allocation past capacity should fail");
    assert_eq!(err.unwrap_err().kind, ErrorKind::InternalError);
}

/// GC completeness contract: objects unreachable at cycle start are
/// reclaimed by the end of that cycle
#[test]
fn test_gc_completeness_contract() {
    let mut heap = Heap::new();
    let unreachable = heap.alloc_object().unwrap();
    let reachable = heap.alloc_object().unwrap();

    heap.collect_full(&[TaggedValue::from_object(reachable)]);

    assert!(
        !heap.contains(unreachable),
        "unreachable cell should be swept"
    );
    assert!(heap.contains(reachable), "rooted cell should survive");
}

/// GC soundness contract: an object reachable from a root when the cycle
/// finishes is never reclaimed, even when the reference was stored into an
/// already-marked object mid-cycle
#[test]
fn test_gc_soundness_mid_cycle_store_contract() {
    let mut heap = Heap::new();
    let victim = heap.alloc_object().unwrap();
    let holder = heap
        .alloc_array(vec![TaggedValue::from_object(victim)])
        .unwrap();
    let scanned = heap.alloc_array(vec![]).unwrap();
    let roots = [
        TaggedValue::from_object(holder),
        TaggedValue::from_object(scanned),
    ];

    assert!(heap.start_incremental(&roots));
    // One unit of work: the last-pushed root (`scanned`) is traced and
    // turns black while `holder` still waits on the mark stack.
    heap.mark_step(1);
    // Hide the victim behind the black object, then erase the old path.
    heap.array_set(scanned, 0, TaggedValue::from_object(victim))
        .unwrap();
    heap.array_set(holder, 0, TaggedValue::undefined()).unwrap();
    heap.finish_incremental(&roots);

    assert!(
        heap.contains(victim),
        "write barrier should keep the re-homed cell alive"
    );
}

/// GC soundness contract: allocation during marking survives the
/// in-flight cycle
#[test]
fn test_gc_soundness_fresh_allocation_contract() {
    let mut heap = Heap::new();
    let root = heap.alloc_array(vec![]).unwrap();
    let roots = [TaggedValue::from_object(root)];

    assert!(heap.start_incremental(&roots));
    while heap.mark_step(1) {}
    let fresh = heap.alloc_object().unwrap();
    heap.array_set(root, 0, TaggedValue::from_object(fresh))
        .unwrap();
    heap.finish_incremental(&roots);

    assert!(
        heap.contains(fresh),
        "mid-cycle allocation stored into a live object should survive"
    );
}

/// Test mark_step() returns true exactly while marking work remains
#[test]
fn test_mark_step_progress_contract() {
    let mut heap = Heap::new();
    let a = heap.alloc_object().unwrap();
    let chain = heap
        .alloc_array(vec![TaggedValue::from_object(a)])
        .unwrap();

    assert!(heap.start_incremental(&[TaggedValue::from_object(chain)]));
    // Tracing one cell leaves its child queued.
    assert!(heap.mark_step(1), "work should remain after a partial step");
    while heap.mark_step(64) {}
    assert!(!heap.mark_step(64), "drained stack should report no work");
    heap.finish_incremental(&[TaggedValue::from_object(chain)]);
    assert!(heap.contains(a));
}

/// Test collection phases always return to Idle and clear mark bits
#[test]
fn test_cycle_returns_to_idle_contract() {
    let mut heap = Heap::new();
    let r = heap.alloc_object().unwrap();
    let roots = [TaggedValue::from_object(r)];

    heap.collect_full(&[TaggedValue::from_object(r)]);
    assert_eq!(heap.phase(), GcPhase::Idle);
    assert!(
        !heap.get(r).unwrap().header.marked,
        "survivor mark bits should be cleared for the next cycle"
    );

    // A second cycle must behave identically.
    heap.collect_full(&roots);
    assert!(heap.contains(r));
    assert_eq!(heap.stats().cycles, 2);
}

/// Test create_persistent() keeps a cell alive until the handle drops
#[test]
fn test_persistent_handle_contract() {
    let mut heap = Heap::new();
    let r = heap.alloc_object().unwrap();
    let handle = heap.create_persistent(TaggedValue::from_object(r));
    assert_eq!(handle.value().as_object(), Some(r));

    heap.collect_full(&[]);
    assert!(heap.contains(r), "handle should root the cell");

    drop(handle);
    heap.collect_full(&[]);
    assert!(!heap.contains(r), "dropped handle should release the cell");
}

/// Test same_value_zero() key semantics used by maps and sets
#[test]
fn test_same_value_zero_contract() {
    let mut heap = Heap::new();
    let nan = TaggedValue::from_double(f64::NAN);
    assert!(heap.same_value_zero(nan, nan), "NaN should match NaN");
    assert!(
        heap.same_value_zero(
            TaggedValue::from_double(0.0),
            TaggedValue::from_double(-0.0)
        ),
        "zeroes should match regardless of sign"
    );
    assert!(heap.same_value_zero(
        TaggedValue::from_int32(3),
        TaggedValue::from_double(3.0)
    ));

    let s1 = heap.alloc_string_from_str("x").unwrap();
    let s2 = heap.alloc_string_from_str("x").unwrap();
    assert!(
        heap.same_value_zero(TaggedValue::from_object(s1), TaggedValue::from_object(s2)),
        "strings should compare by content"
    );
}
