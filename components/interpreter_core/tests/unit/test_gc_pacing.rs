//! Tests for incremental collection driven by the dispatch loop

use bytecode_stream::{BytecodeWriter, Constant, Instruction, Opcode};
use heap_manager::GcConfig;
use interpreter_core::Vm;
use value_model::{EngineResult, TaggedValue};

/// Allocates one throwaway array per iteration so the heap crosses a
/// small threshold many times over.
fn array_churn_unit(iterations: i32) -> BytecodeWriter {
    let mut writer = BytecodeWriter::new();
    writer.emit(Instruction::LoadInt { value: 0 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    let top = writer.new_label();
    writer.bind_label(top).unwrap();
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.emit(Instruction::StoreReg { reg: 1 });
    writer.emit(Instruction::CreateArray { first: 1, count: 1 });
    writer.emit(Instruction::StoreReg { reg: 2 });
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.emit(Instruction::Add { lhs: 0 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: iterations });
    writer.emit(Instruction::LessThan { lhs: 0 });
    writer.emit_jump(Opcode::JumpIfTrue, top).unwrap();
    writer.emit(Instruction::LoadReg { reg: 0 });
    writer.emit(Instruction::Return);
    writer
}

#[test]
fn test_cycles_complete_under_interpretation() {
    let mut vm = Vm::with_config(GcConfig {
        initial_gc_threshold: 8,
        step_budget: 4,
        ..GcConfig::default()
    });
    let unit = array_churn_unit(50).into_unit().unwrap();
    let result = vm.execute(&unit).unwrap();

    assert_eq!(result.as_int32(), Some(50));
    let stats = vm.gc_stats();
    assert!(
        stats.cycles >= 1,
        "a 50-array loop over an 8-cell threshold should complete a cycle"
    );
    assert!(stats.objects_swept > 0, "dead arrays should be reclaimed");
    assert!(
        vm.heap().live_count() < 50,
        "the heap should not retain every dead iteration array"
    );
}

#[test]
fn test_live_string_survives_collection_cycles() {
    let mut vm = Vm::with_config(GcConfig {
        initial_gc_threshold: 4,
        step_budget: 2,
        ..GcConfig::default()
    });

    // r0 accumulates a string, r1 counts iterations. Every concat
    // allocates and abandons the previous accumulation.
    let mut writer = BytecodeWriter::new();
    let x = writer.add_constant(Constant::String("x".to_string())).unwrap();
    let y = writer.add_constant(Constant::String("y".to_string())).unwrap();
    writer.emit(Instruction::LoadConst { index: x });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 0 });
    writer.emit(Instruction::StoreReg { reg: 1 });
    let top = writer.new_label();
    writer.bind_label(top).unwrap();
    writer.emit(Instruction::LoadConst { index: y });
    writer.emit(Instruction::Add { lhs: 0 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.emit(Instruction::Add { lhs: 1 });
    writer.emit(Instruction::StoreReg { reg: 1 });
    writer.emit(Instruction::LoadInt { value: 20 });
    writer.emit(Instruction::LessThan { lhs: 1 });
    writer.emit_jump(Opcode::JumpIfTrue, top).unwrap();
    writer.emit(Instruction::LoadReg { reg: 0 });
    writer.emit(Instruction::Return);

    let unit = writer.into_unit().unwrap();
    let result = vm.execute(&unit).unwrap();

    let s = result.as_object().expect("loop should return a heap string");
    let expected = format!("x{}", "y".repeat(20));
    assert_eq!(vm.heap().string_value(s).unwrap(), expected);
    assert!(
        vm.gc_stats().cycles >= 1,
        "40+ string allocations over a 4-cell threshold should collect"
    );
}

fn host_gc(vm: &mut Vm, _this: TaggedValue, _args: &[TaggedValue]) -> EngineResult<TaggedValue> {
    vm.collect_garbage();
    Ok(TaggedValue::undefined())
}

#[test]
fn test_host_collection_preserves_caller_registers() {
    let mut vm = Vm::new();
    vm.register_host_function("gc", host_gc).unwrap();
    let junk = vm.heap_mut().alloc_object().unwrap();

    let mut writer = BytecodeWriter::new();
    let keep = writer.add_constant(Constant::String("keep".to_string())).unwrap();
    let gc = writer.add_name("gc").unwrap();
    writer.emit(Instruction::LoadConst { index: keep });
    writer.emit(Instruction::StoreReg { reg: 1 });
    writer.emit(Instruction::LoadGlobal { name: gc });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::Call { callee: 0, first_arg: 2, argc: 0 });
    writer.emit(Instruction::LoadReg { reg: 1 });
    writer.emit(Instruction::Return);

    let unit = writer.into_unit().unwrap();
    let result = vm.execute(&unit).unwrap();

    let s = result.as_object().expect("register value should survive");
    assert_eq!(vm.heap().string_value(s).unwrap(), "keep");
    assert!(!vm.heap().contains(junk), "unrooted cell should be reclaimed");
    assert_eq!(vm.gc_stats().cycles, 1);
}
