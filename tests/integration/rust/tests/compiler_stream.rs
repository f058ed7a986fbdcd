//! Compiler-to-stream integration tests
//!
//! Verifies that compiled units decode back into the instruction shapes
//! the generator intended: operand encoding, pool interning, and jump
//! patching all cross the writer/decoder boundary intact.

use bytecode_stream::{decode_instruction, CodeUnit, Constant, Disassembler, Instruction};
use source_compiler::compile;

/// Decode a unit's whole stream into instruction values.
fn instructions(unit: &CodeUnit) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < unit.code.len() {
        let (instruction, next) = decode_instruction(&unit.code, offset).unwrap();
        out.push(instruction);
        offset = next;
    }
    out
}

/// Test a binary expression compiles to the register-operand shape
#[test]
fn test_addition_compiles_to_accumulator_form() {
    let unit = compile("1 + 2").unwrap();

    assert_eq!(
        instructions(&unit),
        vec![
            Instruction::LoadInt { value: 1 },
            Instruction::StoreReg { reg: 0 },
            Instruction::LoadInt { value: 2 },
            Instruction::Add { lhs: 0 },
            Instruction::Return,
        ]
    );
    assert_eq!(unit.register_count, 1);
}

/// Test decoded offsets partition the stream exactly
#[test]
fn test_decode_offsets_partition_compiled_stream() {
    let unit = compile("var x = 1; if (x < 3) { x = x + 1; } x").unwrap();

    let mut offset = 0;
    let mut steps = 0;
    while offset < unit.code.len() {
        let (_, next) = decode_instruction(&unit.code, offset).unwrap();
        assert!(next > offset, "decoding must consume bytes");
        offset = next;
        steps += 1;
    }
    assert_eq!(offset, unit.code.len());
    assert!(steps > 5);
}

/// Test number constants outside the int32 range go through the pool
#[test]
fn test_wide_literals_use_constant_pool() {
    let unit = compile("2.5").unwrap();

    assert_eq!(unit.constants, vec![Constant::Number(2.5)]);
    assert_eq!(
        instructions(&unit)[0],
        Instruction::LoadConst { index: 0 }
    );
}

/// Test repeated literals and names intern to single pool entries
#[test]
fn test_pools_intern_duplicates() {
    let unit = compile("shared = 1.5; shared = shared + 1.5").unwrap();

    let numbers = unit
        .constants
        .iter()
        .filter(|c| **c == Constant::Number(1.5))
        .count();
    assert_eq!(numbers, 1);

    let names = unit.names.iter().filter(|n| *n == "shared").count();
    assert_eq!(names, 1);
}

/// Test string literals land in the constant pool once
#[test]
fn test_string_literals_pooled() {
    let unit = compile("'hi' + 'hi'").unwrap();

    let strings = unit
        .constants
        .iter()
        .filter(|c| **c == Constant::String("hi".to_string()))
        .count();
    assert_eq!(strings, 1);
}

/// Test a while loop patches a backward jump
#[test]
fn test_while_loop_emits_backward_jump() {
    let unit = compile("var x = 0; while (x < 3) { x = x + 1; }").unwrap();

    let decoded = instructions(&unit);
    let backward = decoded.iter().any(|instruction| {
        matches!(instruction, Instruction::Jump { offset } if *offset < 0)
    });
    let forward_exit = decoded.iter().any(|instruction| {
        matches!(instruction, Instruction::JumpIfFalse { offset } if *offset > 0)
    });
    assert!(backward, "loop needs a backward jump to the test");
    assert!(forward_exit, "loop needs a forward exit branch");
}

/// Test jump operands resolve to decodable instruction boundaries
#[test]
fn test_jump_targets_are_instruction_boundaries() {
    let unit = compile("var x = 0; if (x == 0) { x = 1; } else { x = 2; } while (x < 4) { x = x + 1; } x").unwrap();

    // Collect every valid instruction start.
    let mut boundaries = Vec::new();
    let mut offset = 0;
    while offset < unit.code.len() {
        boundaries.push(offset);
        let (_, next) = decode_instruction(&unit.code, offset).unwrap();
        offset = next;
    }
    boundaries.push(unit.code.len());

    // Re-walk and check the target of every jump.
    let mut offset = 0;
    while offset < unit.code.len() {
        let (instruction, next) = decode_instruction(&unit.code, offset).unwrap();
        let relative = match instruction {
            Instruction::Jump { offset } => Some(offset),
            Instruction::JumpIfTrue { offset } => Some(offset),
            Instruction::JumpIfFalse { offset } => Some(offset),
            _ => None,
        };
        if let Some(relative) = relative {
            let target = (next as i64 + i64::from(relative)) as usize;
            assert!(
                boundaries.contains(&target),
                "jump at {offset} lands inside an instruction"
            );
        }
        offset = next;
    }
}

/// Test for-of lowers to the iterator opcodes
#[test]
fn test_for_of_lowers_to_iterator_opcodes() {
    let unit = compile("for (var v of [1, 2]) { v; }").unwrap();

    let decoded = instructions(&unit);
    assert!(decoded.contains(&Instruction::GetIterator));
    assert!(decoded.contains(&Instruction::IteratorNext));
}

/// Test the disassembler renders compiled output with resolved pools
#[test]
fn test_disassembly_of_compiled_unit() {
    let unit = compile("greeting = 'hello'; greeting.length").unwrap();
    let listing = Disassembler::disassemble(&unit).unwrap();

    assert!(listing.contains("LoadConst 0 ; \"hello\""));
    assert!(listing.contains("StoreGlobal"));
    assert!(listing.contains("greeting"));
    assert!(listing.contains("GetProperty"));
    assert!(listing.contains("Return"));
}

/// Test compiled register budgets stay within the frame the unit declares
#[test]
fn test_register_count_covers_all_operands() {
    let unit = compile(
        "var a = 1; var b = 2; var c = 3; a + b * c + a * (b + c)",
    )
    .unwrap();

    for instruction in instructions(&unit) {
        if let Some(max) = instruction.max_register() {
            assert!(
                u16::from(max) < unit.register_count,
                "operand register {max} exceeds frame size {}",
                unit.register_count
            );
        }
    }
}
