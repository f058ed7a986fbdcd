//! Tests for the walk driver and handler-based consumers

use bytecode_stream::{
    walk, BytecodeHandler, BytecodeWriter, Disassembler, Instruction, Opcode, OffsetTracker,
    Verdict,
};

/// Counts instructions and records the opcodes the start hook saw.
#[derive(Default)]
struct OpcodeCounter {
    seen: Vec<Opcode>,
    skip_loads: bool,
    dispatched_loads: usize,
}

impl BytecodeHandler for OpcodeCounter {
    fn start_instruction(&mut self, _tracker: &OffsetTracker, opcode: Opcode) -> Verdict {
        self.seen.push(opcode);
        if self.skip_loads && opcode == Opcode::LoadInt {
            Verdict::Skip
        } else {
            Verdict::Process
        }
    }

    fn visit_load_int(&mut self, _tracker: &OffsetTracker, _value: i32) {
        self.dispatched_loads += 1;
    }
}

fn sample_unit() -> bytecode_stream::CodeUnit {
    let mut writer = BytecodeWriter::new();
    writer.emit(Instruction::LoadInt { value: 1 });
    writer.emit(Instruction::StoreReg { reg: 0 });
    writer.emit(Instruction::LoadInt { value: 2 });
    writer.emit(Instruction::Add { lhs: 0 });
    writer.emit(Instruction::Return);
    writer.into_unit().unwrap()
}

#[test]
fn test_walk_visits_in_stream_order() {
    let unit = sample_unit();
    let mut counter = OpcodeCounter::default();
    walk(&unit.code, &mut counter).unwrap();
    assert_eq!(
        counter.seen,
        vec![
            Opcode::LoadInt,
            Opcode::StoreReg,
            Opcode::LoadInt,
            Opcode::Add,
            Opcode::Return,
        ]
    );
    assert_eq!(counter.dispatched_loads, 2);
}

#[test]
fn test_skip_verdict_still_advances_decoding() {
    let unit = sample_unit();
    let mut counter = OpcodeCounter {
        skip_loads: true,
        ..OpcodeCounter::default()
    };
    let tracker = walk(&unit.code, &mut counter).unwrap();
    // Every instruction is still decoded and offered to the start hook.
    assert_eq!(counter.seen.len(), 5);
    assert_eq!(counter.dispatched_loads, 0);
    assert_eq!(tracker.next_instruction_offset(), unit.code.len());
}

#[test]
fn test_walk_and_disassembler_agree_on_instruction_count() {
    let unit = sample_unit();
    let mut counter = OpcodeCounter::default();
    walk(&unit.code, &mut counter).unwrap();

    let listing = Disassembler::disassemble(&unit).unwrap();
    assert_eq!(listing.lines().count(), counter.seen.len());
}

#[test]
fn test_disassembler_line_offsets_match_decode_boundaries() {
    let unit = sample_unit();
    let listing = Disassembler::disassemble(&unit).unwrap();

    let offsets: Vec<usize> = listing
        .lines()
        .map(|line| {
            line.split_whitespace()
                .next()
                .and_then(|t| t.parse().ok())
                .expect("each line starts with an offset")
        })
        .collect();
    // LoadInt(5) StoreReg(2) LoadInt(5) Add(2) Return(1)
    assert_eq!(offsets, vec![0, 5, 7, 12, 14]);
}
