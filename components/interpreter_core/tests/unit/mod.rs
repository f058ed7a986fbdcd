//! Unit tests for interpreter_core components

mod test_gc_pacing;
