//! Stream-to-interpreter integration tests
//!
//! Hand-assembled code units executed on the VM, checking that writer
//! output (labels, pools, register windows) drives the dispatch loop the
//! way the generator relies on.

use bytecode_stream::{BytecodeWriter, Constant, Instruction};
use interpreter_core::Vm;
use value_model::{ErrorKind, TaggedValue};

/// Test a label-built counting loop sums correctly
#[test]
fn test_label_loop_executes() {
    // r0 = 0; r1 = 0; while (r1 < 5) { r0 += r1; r1 += 1 } return r0
    let mut writer = BytecodeWriter::new();
    let top = writer.new_label();
    let exit = writer.new_label();

    writer.emit(Instruction::LoadInt { value: 0 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 0 });
    writer.emit(Instruction::StoreReg { reg: 1 });

    writer.bind_label(top).unwrap();
    writer.emit(Instruction::LoadInt { value: 5 });
    writer.emit(Instruction::LessThan { lhs: 1 });
    writer
        .emit_jump(bytecode_stream::Opcode::JumpIfFalse, exit)
        .unwrap();

    writer.emit(Instruction::LoadReg { reg: 1 });
    writer.emit(Instruction::Add { lhs: 0 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.emit(Instruction::Add { lhs: 1 });
    writer.emit(Instruction::StoreReg { reg: 1 });
    writer
        .emit_jump(bytecode_stream::Opcode::Jump, top)
        .unwrap();

    writer.bind_label(exit).unwrap();
    writer.emit(Instruction::LoadReg { reg: 0 });
    writer.emit(Instruction::Return);

    let unit = writer.into_unit().unwrap();
    let mut vm = Vm::new();
    let result = vm.execute(&unit).unwrap();
    assert_eq!(result.as_int32(), Some(10));
}

/// Test pool constants materialize as heap strings during execution
#[test]
fn test_string_constant_materializes() {
    let mut writer = BytecodeWriter::new();
    let index = writer
        .add_constant(Constant::String("materialized".to_string()))
        .unwrap();
    writer.emit(Instruction::LoadConst { index });
    writer.emit(Instruction::Return);
    let unit = writer.into_unit().unwrap();

    let mut vm = Vm::new();
    let result = vm.execute(&unit).unwrap();
    let handle = result.as_object().unwrap();
    assert_eq!(vm.heap().string_value(handle).unwrap(), "materialized");
}

/// Test a host collection with three elements answers four next() calls
#[test]
fn test_host_collection_three_elements_four_next_calls() {
    let mut vm = Vm::new();
    let set = vm.heap_mut().alloc_set().unwrap();
    for i in [10, 20, 30] {
        vm.heap_mut()
            .set_add(set, TaggedValue::from_int32(i))
            .unwrap();
    }
    vm.set_global("fixture", TaggedValue::from_object(set));

    // r0 = iterator; r1..r4 = the four result objects.
    let mut writer = BytecodeWriter::new();
    let name = writer.add_name("fixture").unwrap();
    writer.emit(Instruction::LoadGlobal { name });
    writer.emit(Instruction::GetIterator);
    writer.emit(Instruction::StoreReg { reg: 0 });
    for reg in 1..=4 {
        writer.emit(Instruction::LoadReg { reg: 0 });
        writer.emit(Instruction::IteratorNext);
        writer.emit(Instruction::StoreReg { reg });
    }
    writer.emit(Instruction::CreateArray { first: 1, count: 4 });
    writer.emit(Instruction::Return);
    let unit = writer.into_unit().unwrap();

    let results = vm.execute(&unit).unwrap();
    let array = results.as_object().unwrap();

    let expected = [
        (Some(10), false),
        (Some(20), false),
        (Some(30), false),
        (None, true),
    ];
    for (i, (value, done)) in expected.iter().enumerate() {
        let entry = vm.heap().array_get(array, i as u32).unwrap();
        let result = entry.as_object().unwrap();
        let v = vm.heap().object_get_property(result, "value").unwrap();
        let d = vm.heap().object_get_property(result, "done").unwrap();
        match value {
            Some(n) => assert_eq!(v.as_int32(), Some(*n), "step {i}"),
            None => assert!(v.is_undefined(), "step {i}"),
        }
        assert_eq!(d.as_bool(), Some(*done), "step {i}");
    }
}

/// Test iterator protocol functions agree with the opcodes
#[test]
fn test_iterator_module_matches_vm_behavior() {
    let mut vm = Vm::new();
    let array = vm
        .heap_mut()
        .alloc_array(vec![
            TaggedValue::from_int32(7),
            TaggedValue::from_int32(8),
        ])
        .unwrap();

    // Drive the same iterator the VM's opcodes would allocate, but through
    // the protocol functions directly.
    let iter = iterator_objects::new_array_iterator(
        vm.heap_mut(),
        array,
        heap_manager::IterationKind::Values,
    )
    .unwrap();

    assert_eq!(
        iterator_objects::iterator_next(vm.heap_mut(), iter).unwrap(),
        (TaggedValue::from_int32(7), false)
    );
    assert_eq!(
        iterator_objects::iterator_next(vm.heap_mut(), iter).unwrap(),
        (TaggedValue::from_int32(8), false)
    );
    assert_eq!(
        iterator_objects::iterator_next(vm.heap_mut(), iter).unwrap(),
        (TaggedValue::undefined(), true)
    );
    // Terminal stays terminal.
    assert_eq!(
        iterator_objects::iterator_next(vm.heap_mut(), iter).unwrap(),
        (TaggedValue::undefined(), true)
    );
}

/// Test host call arguments travel through the register window
#[test]
fn test_host_call_window() {
    fn host_max(
        _vm: &mut Vm,
        _this: TaggedValue,
        args: &[TaggedValue],
    ) -> value_model::EngineResult<TaggedValue> {
        let best = args
            .iter()
            .filter_map(|v| v.as_int32())
            .max()
            .unwrap_or(0);
        Ok(TaggedValue::from_int32(best))
    }

    let mut vm = Vm::new();
    vm.register_host_function("max", host_max).unwrap();

    let mut writer = BytecodeWriter::new();
    let name = writer.add_name("max").unwrap();
    writer.emit(Instruction::LoadGlobal { name });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 4 });
    writer.emit(Instruction::StoreReg { reg: 1 });
    writer.emit(Instruction::LoadInt { value: 9 });
    writer.emit(Instruction::StoreReg { reg: 2 });
    writer.emit(Instruction::LoadInt { value: 2 });
    writer.emit(Instruction::StoreReg { reg: 3 });
    writer.emit(Instruction::Call {
        callee: 0,
        first_arg: 1,
        argc: 3,
    });
    writer.emit(Instruction::Return);
    let unit = writer.into_unit().unwrap();

    let result = vm.execute(&unit).unwrap();
    assert_eq!(result.as_int32(), Some(9));
}

/// Test invalid opcode bytes fail with the faulting offset
#[test]
fn test_invalid_tag_reports_offset() {
    let mut writer = BytecodeWriter::new();
    writer.emit(Instruction::LoadInt { value: 1 });
    let mut unit = writer.into_unit().unwrap();
    unit.code.push(0xff);

    let mut vm = Vm::new();
    let error = vm.execute(&unit).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InternalError);
    // The LoadInt spans offsets 0..5, so the bad tag sits at 5.
    assert_eq!(error.offset, Some(5));
}
