//! End-to-end shell integration tests
//!
//! Runs the complete engine through the js_shell Runtime facade: source
//! text and script files in, final values out. This is the highest level
//! integration suite, covering the compiler, interpreter, heap, iterator
//! protocol, and seeded host functions together.

use bytecode_stream::{BytecodeWriter, Instruction};
use js_shell::{Runtime, ShellError};
use std::fs;
use tempfile::TempDir;
use value_model::ErrorKind;

/// Test: Addition through the full pipeline
#[test]
fn test_e2e_addition() {
    let mut runtime = Runtime::new().unwrap();
    let result = runtime.execute_source("1 + 2").unwrap();
    assert_eq!(result.as_int32(), Some(3));
}

/// Test: Integer overflow promotes to a double result
#[test]
fn test_e2e_overflow_promotes_to_double() {
    let mut runtime = Runtime::new().unwrap();
    let result = runtime.execute_source("2147483647 + 1").unwrap();
    assert_eq!(result.as_int32(), None);
    assert_eq!(result.as_double(), Some(2147483648.0));
}

/// Test: A multi-line script file using a host collection
#[test]
fn test_e2e_script_file_with_host_collection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tools.js");
    fs::write(
        &path,
        "var tools = newSet('axe', 'bow', 'axe');\n\
         var labels = '';\n\
         for (var tool of tools) { labels = labels + tool + ';'; }\n\
         labels + tools.size\n",
    )
    .unwrap();

    let mut runtime = Runtime::new().unwrap();
    let result = runtime.execute_file(path.to_str().unwrap()).unwrap();
    assert_eq!(runtime.display(result), "axe;bow;2");
}

/// Test: One script iterates every collection kind
#[test]
fn test_e2e_all_collection_kinds_iterate() {
    let mut runtime = Runtime::new().unwrap();
    let result = runtime
        .execute_source(
            "var out = ''; \
             for (var n of [1, 2]) { out = out + n; } \
             for (var c of 'ab') { out = out + c; } \
             for (var v of newSet(3, 3, 4)) { out = out + v; } \
             for (var pair of newMap('k', 5)) { out = out + pair[0] + pair[1]; } \
             out",
        )
        .unwrap();
    assert_eq!(runtime.display(result), "12ab34k5");
}

/// Test: The gc host function collects mid-script
#[test]
fn test_e2e_host_gc_in_script() {
    let mut runtime = Runtime::new().unwrap();
    let result = runtime
        .execute_source("var i = 0; while (i < 50) { [i]; i = i + 1; } gc(); i")
        .unwrap();
    assert_eq!(result.as_int32(), Some(50));
    assert!(runtime.gc_stats().cycles >= 1);
    assert!(runtime.gc_stats().objects_swept >= 1);
}

/// Test: A script file seeds globals that a precompiled unit reads back
#[test]
fn test_e2e_file_then_precompiled_unit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("seed.js");
    fs::write(
        &path,
        "inventory = newSet('axe', 'bow', 'axe'); count = inventory.size",
    )
    .unwrap();

    let mut runtime = Runtime::new().unwrap();
    runtime.execute_file(path.to_str().unwrap()).unwrap();

    let mut writer = BytecodeWriter::new();
    let name = writer.add_name("count").unwrap();
    writer.emit(Instruction::LoadGlobal { name });
    writer.emit(Instruction::Return);
    let unit = writer.into_unit().unwrap();

    let result = runtime.execute_unit(&unit).unwrap();
    assert_eq!(result.as_int32(), Some(2));
}

/// Test: A reference error in a script file reports kind, message, and exit code
#[test]
fn test_e2e_reference_error_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.js");
    fs::write(&path, "var a = 1; a + missing").unwrap();

    let mut runtime = Runtime::new().unwrap();
    let error = runtime.execute_file(path.to_str().unwrap()).unwrap_err();
    assert_eq!(error.exit_code(), 1);

    let ShellError::Engine(engine) = error else {
        panic!("expected an engine error, got {error}");
    };
    assert_eq!(engine.kind, ErrorKind::ReferenceError);
    assert!(engine.message.contains("missing is not defined"));
}

/// Test: A missing script file maps to the environment exit code
#[test]
fn test_e2e_missing_file_io_error() {
    let mut runtime = Runtime::new().unwrap();
    let error = runtime
        .execute_file("/no/such/dir/vesper-script.js")
        .unwrap_err();
    assert_eq!(error.exit_code(), 2);
    assert!(matches!(error, ShellError::Io { .. }));
    assert!(error.to_string().contains("cannot read"));
}

/// Test: A long session keeps its globals while garbage stays bounded
#[test]
fn test_e2e_long_session_heap_stays_bounded() {
    let mut runtime = Runtime::new().unwrap();
    runtime.execute_source("keep = 'durable'").unwrap();

    for _ in 0..30 {
        let result = runtime
            .execute_source("var junk = [1, 2, 3, 4]; junk.length")
            .unwrap();
        assert_eq!(result.as_int32(), Some(4));
    }

    let result = runtime.execute_source("keep").unwrap();
    assert_eq!(runtime.display(result), "durable");

    runtime.vm().collect_garbage();
    assert!(runtime.heap().live_count() < 20);
}

/// Test: Empty program
#[test]
fn test_e2e_empty_program() {
    let mut runtime = Runtime::new().unwrap();
    let result = runtime.execute_source("").unwrap();
    assert!(result.is_undefined());
}

/// Test: A runtime with bytecode listing enabled still executes normally
#[test]
fn test_e2e_print_bytecode_runtime_executes() {
    let mut runtime = Runtime::new().unwrap().with_print_bytecode(true);
    assert!(runtime.is_print_bytecode_enabled());
    let result = runtime.execute_source("1 + 1").unwrap();
    assert_eq!(result.as_int32(), Some(2));
}
