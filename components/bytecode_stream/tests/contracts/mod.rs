//! Contract tests for bytecode_stream API
//!
//! These tests verify the public API matches the contract specification.

use bytecode_stream::{
    decode_instruction, walk, BytecodeHandler, BytecodeWriter, CodeCursor, Instruction, Opcode,
    OffsetTracker, Verdict,
};
use value_model::ErrorKind;

struct NullHandler;

impl BytecodeHandler for NullHandler {}

/// Test decode_instruction() returns the instruction and its end offset
#[test]
fn test_decode_instruction_contract() {
    let mut code = Vec::new();
    Instruction::LoadInt { value: 42 }.encode_into(&mut code);

    let (instruction, next) = decode_instruction(&code, 0).unwrap();
    assert_eq!(instruction, Instruction::LoadInt { value: 42 });
    assert_eq!(next, 5, "next offset should be past tag and operands");
}

/// Test decode_instruction() fails fast on an unknown opcode tag
#[test]
fn test_invalid_opcode_contract() {
    let code = vec![0xFF];
    let err = decode_instruction(&code, 0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InternalError);
    assert!(
        err.message.contains("invalid opcode"),
        "diagnostic should name the failure"
    );
    assert_eq!(err.offset, Some(0), "diagnostic should carry the offset");
}

/// Decode-loop offset contract: after N instructions,
/// next_instruction_offset equals the sum of their sizes and
/// absolute_offset(0) equals next_instruction_offset
#[test]
fn test_offset_invariant_contract() {
    let instructions = [
        Instruction::LoadInt { value: 9 },
        Instruction::StoreReg { reg: 1 },
        Instruction::LoadUndefined,
        Instruction::Jump { offset: 0 },
        Instruction::Return,
    ];
    let mut code = Vec::new();
    for instruction in &instructions {
        instruction.encode_into(&mut code);
    }
    let total: usize = instructions.iter().map(Instruction::size).sum();

    let tracker = walk(&code, &mut NullHandler).unwrap();
    assert_eq!(tracker.next_instruction_offset(), total);
    assert_eq!(tracker.absolute_offset(0), total as i64);
    let last_size = instructions[instructions.len() - 1].size();
    assert_eq!(tracker.current_instruction_offset(), total - last_size);
}

/// Test OffsetTracker records current = previous next at each step
#[test]
fn test_tracker_step_contract() {
    let mut tracker = OffsetTracker::new();
    tracker.advance_to(5);
    assert_eq!(tracker.current_instruction_offset(), 0);
    assert_eq!(tracker.next_instruction_offset(), 5);
    tracker.advance_to(7);
    assert_eq!(tracker.current_instruction_offset(), 5);
    assert_eq!(tracker.next_instruction_offset(), 7);
    assert_eq!(tracker.absolute_offset(-7), 0);
}

/// Test start_instruction() Verdict controls dispatch
#[test]
fn test_verdict_contract() {
    struct SkipAll {
        starts: usize,
        ends: usize,
    }
    impl BytecodeHandler for SkipAll {
        fn start_instruction(&mut self, _t: &OffsetTracker, _o: Opcode) -> Verdict {
            self.starts += 1;
            Verdict::Skip
        }
        fn end_instruction(&mut self, _t: &OffsetTracker, _o: Opcode) {
            self.ends += 1;
        }
    }

    let mut code = Vec::new();
    Instruction::LoadTrue.encode_into(&mut code);
    Instruction::Return.encode_into(&mut code);

    let mut handler = SkipAll { starts: 0, ends: 0 };
    walk(&code, &mut handler).unwrap();
    assert_eq!(handler.starts, 2, "start hook should see every instruction");
    assert_eq!(handler.ends, 0, "skipped instructions get no end hook");
}

/// Test CodeCursor::jump_relative() resolves against the next offset
#[test]
fn test_cursor_jump_contract() {
    let mut writer = BytecodeWriter::new();
    let end = writer.new_label();
    writer.emit_jump(Opcode::Jump, end).unwrap();
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.bind_label(end).unwrap();
    writer.emit(Instruction::Return);
    let unit = writer.into_unit().unwrap();

    let mut cursor = CodeCursor::new(&unit.code);
    let Some(Instruction::Jump { offset }) = cursor.step().unwrap() else {
        panic!("expected jump first");
    };
    cursor.jump_relative(offset).unwrap();
    assert_eq!(
        cursor.step().unwrap(),
        Some(Instruction::Return),
        "jump should skip the LoadInt"
    );
}

/// Test BytecodeWriter::into_unit() rejects unbound labels
#[test]
fn test_writer_unbound_label_contract() {
    let mut writer = BytecodeWriter::new();
    let label = writer.new_label();
    writer.emit_jump(Opcode::Jump, label).unwrap();
    let err = writer.into_unit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InternalError);
}
