//! Full pipeline integration tests
//!
//! The complete flow: source -> lexer -> parser -> generator -> code unit
//! -> VM -> result, on a bare VM with no host functions installed.

use interpreter_core::Vm;
use source_compiler::compile;
use value_model::{EngineResult, ErrorKind, TaggedValue};

/// Compile and run source on a fresh VM, keeping the VM for heap reads.
fn run(source: &str) -> (Vm, EngineResult<TaggedValue>) {
    let mut vm = Vm::new();
    let result = compile(source).and_then(|unit| vm.execute(&unit));
    (vm, result)
}

fn eval(source: &str) -> TaggedValue {
    let (_, result) = run(source);
    result.unwrap()
}

fn eval_display(source: &str) -> String {
    let (vm, result) = run(source);
    vm.heap().to_display_string(result.unwrap())
}

/// Test integer addition end to end
#[test]
fn test_pipeline_addition() {
    assert_eq!(eval("1 + 2").as_int32(), Some(3));
}

/// Test int32 overflow promotes to a double result
#[test]
fn test_pipeline_addition_overflow() {
    assert_eq!(eval("2147483647 + 1").as_double(), Some(2_147_483_648.0));
}

/// Test subtraction underflow promotes as well
#[test]
fn test_pipeline_subtraction_underflow() {
    assert_eq!(eval("0 - 2147483647 - 2").as_double(), Some(-2_147_483_649.0));
}

/// Test multiplication by zero keeps the sign rule
#[test]
fn test_pipeline_mul_negative_zero() {
    let result = eval("-2 * 0");
    assert_eq!(result.number_value(), Some(0.0));
    assert!(result.number_value().unwrap().is_sign_negative());
}

/// Test exact integer division stays integral
#[test]
fn test_pipeline_division() {
    assert_eq!(eval("100 / 5").as_int32(), Some(20));
    assert_eq!(eval("7 / 2").as_double(), Some(3.5));
}

/// Test modulo sign follows the dividend
#[test]
fn test_pipeline_modulo_sign() {
    assert_eq!(eval("7 % 3").as_int32(), Some(1));
    assert_eq!(eval("0 - 7 % 3").as_int32(), Some(-1));
    let negative_zero = eval("(0 - 4) % 2");
    assert_eq!(negative_zero.number_value(), Some(0.0));
    assert!(negative_zero.number_value().unwrap().is_sign_negative());
}

/// Test complex arithmetic with precedence and grouping
#[test]
fn test_pipeline_complex_arithmetic() {
    assert_eq!(eval("(10 + 20) * 2 - 18").as_int32(), Some(42));
}

/// Test comparison chain through variables
#[test]
fn test_pipeline_comparisons() {
    assert_eq!(eval("var a = 3; var b = 4; a < b").as_bool(), Some(true));
    assert_eq!(eval("var a = 3; a >= 3").as_bool(), Some(true));
}

/// Test string building across a loop
#[test]
fn test_pipeline_string_loop() {
    let text = eval_display(
        "var out = ''; var i = 0; while (i < 3) { out = out + i + ';'; i = i + 1; } out",
    );
    assert_eq!(text, "0;1;2;");
}

/// Test for-of over an array literal
#[test]
fn test_pipeline_for_of_array() {
    let result = eval("var sum = 0; for (var v of [2, 4, 6]) { sum = sum + v; } sum");
    assert_eq!(result.as_int32(), Some(12));
}

/// Test for-of over a string yields code points in order
#[test]
fn test_pipeline_for_of_string() {
    let text = eval_display("var out = ''; for (var c of 'xyz') { out = c + out; } out");
    assert_eq!(text, "zyx");
}

/// Test nested arrays read back through elements
#[test]
fn test_pipeline_nested_arrays() {
    let result = eval("var grid = [[1, 2], [3, 4]]; grid[1][0]");
    assert_eq!(result.as_int32(), Some(3));
}

/// Test array growth through out-of-bounds writes
#[test]
fn test_pipeline_array_growth() {
    let result = eval("var a = [1]; a[3] = 9; a.length");
    assert_eq!(result.as_int32(), Some(4));
}

/// Test a thrown value surfaces with its display text
#[test]
fn test_pipeline_throw() {
    let (_, result) = run("var reason = 'stop: ' + 7; throw reason");
    let error = result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Error);
    assert_eq!(error.message, "stop: 7");
}

/// Test an undefined global is a reference error with an offset
#[test]
fn test_pipeline_reference_error_offset() {
    let (_, result) = run("missing");
    let error = result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::ReferenceError);
    assert!(error.offset.is_some());
}

/// Test a malformed program reports a syntax error with its position
#[test]
fn test_pipeline_syntax_error_position() {
    let (_, result) = run("var x = ;");
    let error = result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
    assert!(error.message.contains("line 1"));
}

/// Test completion value semantics for mixed statement tails
#[test]
fn test_pipeline_completion_values() {
    assert_eq!(eval("5; 6").as_int32(), Some(6));
    assert!(eval("5; var x = 6;").is_undefined());
    assert!(eval("if (false) { 1 }").is_undefined());
}

/// Test truthiness cases through a conditional
#[test]
fn test_pipeline_truthiness() {
    assert_eq!(eval("var r = 0; if ('') { r = 1; } else { r = 2; } r").as_int32(), Some(2));
    assert_eq!(eval("var r = 0; if ('x') { r = 1; } else { r = 2; } r").as_int32(), Some(1));
    assert_eq!(eval("var r = 0; if ([]) { r = 1; } else { r = 2; } r").as_int32(), Some(1));
}

/// Test deep expression nesting survives the register allocator
#[test]
fn test_pipeline_deep_nesting() {
    let result = eval("((((1 + 2) * (3 + 4)) - ((5 - 3) * 2)) / 1)");
    // (3 * 7 - 4) / 1
    assert_eq!(result.as_int32(), Some(17));
}

/// Test NaN propagation through comparisons
#[test]
fn test_pipeline_nan_comparisons() {
    assert_eq!(eval("0 / 0 < 1").as_bool(), Some(false));
    assert_eq!(eval("0 / 0 == 0 / 0").as_bool(), Some(false));
    assert_eq!(eval("0 / 0 != 0 / 0").as_bool(), Some(true));
}
