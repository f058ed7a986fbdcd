//! Decode loop, offset bookkeeping, and the two-hook handler trait
//!
//! One decode skeleton serves every bytecode consumer. Linear consumers
//! (disassembler, analyzers) implement [`BytecodeHandler`] and let
//! [`walk`] drive them; the executor needs jumps, so it steps a
//! [`CodeCursor`] itself. Both paths share [`decode_instruction`] and the
//! [`OffsetTracker`] rules, so offset attribution is identical everywhere.

use value_model::{EngineError, EngineResult};

use crate::opcode::{Instruction, Opcode};

/// Offset bookkeeping for one pass over an instruction stream.
///
/// At each step the offset where the instruction starts becomes
/// `current_instruction_offset`, and `next_instruction_offset` advances to
/// the position just past its operands. Relative jump operands resolve
/// against the next offset, never the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetTracker {
    current: usize,
    next: usize,
}

impl OffsetTracker {
    /// A tracker positioned before the first instruction.
    pub fn new() -> Self {
        OffsetTracker::default()
    }

    /// Records one decoded instruction ending at `next`.
    pub fn advance_to(&mut self, next: usize) {
        self.current = self.next;
        self.next = next;
    }

    /// Start offset of the last decoded instruction.
    pub fn current_instruction_offset(&self) -> usize {
        self.current
    }

    /// Offset just past the last decoded instruction.
    pub fn next_instruction_offset(&self) -> usize {
        self.next
    }

    /// Resolves a relative jump operand against the next offset.
    pub fn absolute_offset(&self, relative: i32) -> i64 {
        self.next as i64 + relative as i64
    }

    /// Repositions both offsets at a jump target.
    pub fn reset_to(&mut self, offset: usize) {
        self.current = offset;
        self.next = offset;
    }
}

fn truncated(offset: usize, what: &str) -> EngineError {
    EngineError::internal(format!("truncated bytecode: {what}")).at_offset(offset)
}

fn read_u8(code: &[u8], at: usize, start: usize) -> EngineResult<u8> {
    code.get(at).copied().ok_or_else(|| truncated(start, "u8 operand"))
}

fn read_u16(code: &[u8], at: usize, start: usize) -> EngineResult<u16> {
    match code.get(at..at + 2) {
        Some(&[a, b]) => Ok(u16::from_le_bytes([a, b])),
        _ => Err(truncated(start, "u16 operand")),
    }
}

fn read_i32(code: &[u8], at: usize, start: usize) -> EngineResult<i32> {
    match code.get(at..at + 4) {
        Some(&[a, b, c, d]) => Ok(i32::from_le_bytes([a, b, c, d])),
        _ => Err(truncated(start, "i32 operand")),
    }
}

/// Decodes the instruction starting at `offset`. Returns the instruction
/// and the offset just past it.
///
/// An unknown opcode tag or a truncated operand is a compiler bug, not
/// user data, and fails fast with an [`value_model::ErrorKind::InternalError`]
/// carrying the instruction's offset.
pub fn decode_instruction(code: &[u8], offset: usize) -> EngineResult<(Instruction, usize)> {
    let tag = code
        .get(offset)
        .copied()
        .ok_or_else(|| truncated(offset, "instruction tag"))?;
    let opcode = Opcode::from_u8(tag).ok_or_else(|| {
        EngineError::internal(format!("invalid opcode tag {tag:#04x}")).at_offset(offset)
    })?;
    let at = offset + 1;
    let instruction = match opcode {
        Opcode::LoadConst => Instruction::LoadConst {
            index: read_u16(code, at, offset)?,
        },
        Opcode::LoadInt => Instruction::LoadInt {
            value: read_i32(code, at, offset)?,
        },
        Opcode::LoadUndefined => Instruction::LoadUndefined,
        Opcode::LoadNull => Instruction::LoadNull,
        Opcode::LoadTrue => Instruction::LoadTrue,
        Opcode::LoadFalse => Instruction::LoadFalse,
        Opcode::LoadReg => Instruction::LoadReg {
            reg: read_u8(code, at, offset)?,
        },
        Opcode::StoreReg => Instruction::StoreReg {
            reg: read_u8(code, at, offset)?,
        },
        Opcode::LoadGlobal => Instruction::LoadGlobal {
            name: read_u16(code, at, offset)?,
        },
        Opcode::StoreGlobal => Instruction::StoreGlobal {
            name: read_u16(code, at, offset)?,
        },
        Opcode::Add => Instruction::Add {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Sub => Instruction::Sub {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Mul => Instruction::Mul {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Div => Instruction::Div {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Mod => Instruction::Mod {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Neg => Instruction::Neg,
        Opcode::Not => Instruction::Not,
        Opcode::Equal => Instruction::Equal {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::NotEqual => Instruction::NotEqual {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::StrictEqual => Instruction::StrictEqual {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::StrictNotEqual => Instruction::StrictNotEqual {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::LessThan => Instruction::LessThan {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::LessEqual => Instruction::LessEqual {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::GreaterThan => Instruction::GreaterThan {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::GreaterEqual => Instruction::GreaterEqual {
            lhs: read_u8(code, at, offset)?,
        },
        Opcode::Jump => Instruction::Jump {
            offset: read_i32(code, at, offset)?,
        },
        Opcode::JumpIfTrue => Instruction::JumpIfTrue {
            offset: read_i32(code, at, offset)?,
        },
        Opcode::JumpIfFalse => Instruction::JumpIfFalse {
            offset: read_i32(code, at, offset)?,
        },
        Opcode::GetProperty => Instruction::GetProperty {
            name: read_u16(code, at, offset)?,
        },
        Opcode::SetProperty => Instruction::SetProperty {
            obj: read_u8(code, at, offset)?,
            name: read_u16(code, at + 1, offset)?,
        },
        Opcode::GetElement => Instruction::GetElement {
            base: read_u8(code, at, offset)?,
        },
        Opcode::SetElement => Instruction::SetElement {
            base: read_u8(code, at, offset)?,
            index: read_u8(code, at + 1, offset)?,
        },
        Opcode::CreateArray => Instruction::CreateArray {
            first: read_u8(code, at, offset)?,
            count: read_u8(code, at + 1, offset)?,
        },
        Opcode::Call => Instruction::Call {
            callee: read_u8(code, at, offset)?,
            first_arg: read_u8(code, at + 1, offset)?,
            argc: read_u8(code, at + 2, offset)?,
        },
        Opcode::GetIterator => Instruction::GetIterator,
        Opcode::IteratorNext => Instruction::IteratorNext,
        Opcode::Throw => Instruction::Throw,
        Opcode::Return => Instruction::Return,
    };
    Ok((instruction, at + opcode.operand_size()))
}

/// Decision returned by [`BytecodeHandler::start_instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Dispatch to the per-opcode method, then call `end_instruction`.
    Process,
    /// Skip both; decoding still advances past the instruction.
    Skip,
}

/// Hooks for consumers driven by [`walk`].
///
/// `start_instruction` runs after decode, before dispatch; returning
/// [`Verdict::Skip`] suppresses both the per-opcode method and
/// `end_instruction` for that instruction. All per-opcode methods default
/// to doing nothing, so a consumer implements only the opcodes it cares
/// about.
#[allow(unused_variables)]
pub trait BytecodeHandler {
    /// Decide whether the instruction just decoded should be processed.
    fn start_instruction(&mut self, tracker: &OffsetTracker, opcode: Opcode) -> Verdict {
        Verdict::Process
    }

    /// Called after the per-opcode method for a processed instruction.
    fn end_instruction(&mut self, tracker: &OffsetTracker, opcode: Opcode) {}

    /// LoadConst handler.
    fn visit_load_const(&mut self, tracker: &OffsetTracker, index: u16) {}
    /// LoadInt handler.
    fn visit_load_int(&mut self, tracker: &OffsetTracker, value: i32) {}
    /// LoadUndefined handler.
    fn visit_load_undefined(&mut self, tracker: &OffsetTracker) {}
    /// LoadNull handler.
    fn visit_load_null(&mut self, tracker: &OffsetTracker) {}
    /// LoadTrue handler.
    fn visit_load_true(&mut self, tracker: &OffsetTracker) {}
    /// LoadFalse handler.
    fn visit_load_false(&mut self, tracker: &OffsetTracker) {}
    /// LoadReg handler.
    fn visit_load_reg(&mut self, tracker: &OffsetTracker, reg: u8) {}
    /// StoreReg handler.
    fn visit_store_reg(&mut self, tracker: &OffsetTracker, reg: u8) {}
    /// LoadGlobal handler.
    fn visit_load_global(&mut self, tracker: &OffsetTracker, name: u16) {}
    /// StoreGlobal handler.
    fn visit_store_global(&mut self, tracker: &OffsetTracker, name: u16) {}
    /// Add handler.
    fn visit_add(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Sub handler.
    fn visit_sub(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Mul handler.
    fn visit_mul(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Div handler.
    fn visit_div(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Mod handler.
    fn visit_mod(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Neg handler.
    fn visit_neg(&mut self, tracker: &OffsetTracker) {}
    /// Not handler.
    fn visit_not(&mut self, tracker: &OffsetTracker) {}
    /// Equal handler.
    fn visit_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// NotEqual handler.
    fn visit_not_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// StrictEqual handler.
    fn visit_strict_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// StrictNotEqual handler.
    fn visit_strict_not_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// LessThan handler.
    fn visit_less_than(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// LessEqual handler.
    fn visit_less_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// GreaterThan handler.
    fn visit_greater_than(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// GreaterEqual handler.
    fn visit_greater_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {}
    /// Jump handler.
    fn visit_jump(&mut self, tracker: &OffsetTracker, offset: i32) {}
    /// JumpIfTrue handler.
    fn visit_jump_if_true(&mut self, tracker: &OffsetTracker, offset: i32) {}
    /// JumpIfFalse handler.
    fn visit_jump_if_false(&mut self, tracker: &OffsetTracker, offset: i32) {}
    /// GetProperty handler.
    fn visit_get_property(&mut self, tracker: &OffsetTracker, name: u16) {}
    /// SetProperty handler.
    fn visit_set_property(&mut self, tracker: &OffsetTracker, obj: u8, name: u16) {}
    /// GetElement handler.
    fn visit_get_element(&mut self, tracker: &OffsetTracker, base: u8) {}
    /// SetElement handler.
    fn visit_set_element(&mut self, tracker: &OffsetTracker, base: u8, index: u8) {}
    /// CreateArray handler.
    fn visit_create_array(&mut self, tracker: &OffsetTracker, first: u8, count: u8) {}
    /// Call handler.
    fn visit_call(&mut self, tracker: &OffsetTracker, callee: u8, first_arg: u8, argc: u8) {}
    /// GetIterator handler.
    fn visit_get_iterator(&mut self, tracker: &OffsetTracker) {}
    /// IteratorNext handler.
    fn visit_iterator_next(&mut self, tracker: &OffsetTracker) {}
    /// Throw handler.
    fn visit_throw(&mut self, tracker: &OffsetTracker) {}
    /// Return handler.
    fn visit_return(&mut self, tracker: &OffsetTracker) {}
}

fn dispatch<H: BytecodeHandler + ?Sized>(
    handler: &mut H,
    tracker: &OffsetTracker,
    instruction: &Instruction,
) {
    match *instruction {
        Instruction::LoadConst { index } => handler.visit_load_const(tracker, index),
        Instruction::LoadInt { value } => handler.visit_load_int(tracker, value),
        Instruction::LoadUndefined => handler.visit_load_undefined(tracker),
        Instruction::LoadNull => handler.visit_load_null(tracker),
        Instruction::LoadTrue => handler.visit_load_true(tracker),
        Instruction::LoadFalse => handler.visit_load_false(tracker),
        Instruction::LoadReg { reg } => handler.visit_load_reg(tracker, reg),
        Instruction::StoreReg { reg } => handler.visit_store_reg(tracker, reg),
        Instruction::LoadGlobal { name } => handler.visit_load_global(tracker, name),
        Instruction::StoreGlobal { name } => handler.visit_store_global(tracker, name),
        Instruction::Add { lhs } => handler.visit_add(tracker, lhs),
        Instruction::Sub { lhs } => handler.visit_sub(tracker, lhs),
        Instruction::Mul { lhs } => handler.visit_mul(tracker, lhs),
        Instruction::Div { lhs } => handler.visit_div(tracker, lhs),
        Instruction::Mod { lhs } => handler.visit_mod(tracker, lhs),
        Instruction::Neg => handler.visit_neg(tracker),
        Instruction::Not => handler.visit_not(tracker),
        Instruction::Equal { lhs } => handler.visit_equal(tracker, lhs),
        Instruction::NotEqual { lhs } => handler.visit_not_equal(tracker, lhs),
        Instruction::StrictEqual { lhs } => handler.visit_strict_equal(tracker, lhs),
        Instruction::StrictNotEqual { lhs } => handler.visit_strict_not_equal(tracker, lhs),
        Instruction::LessThan { lhs } => handler.visit_less_than(tracker, lhs),
        Instruction::LessEqual { lhs } => handler.visit_less_equal(tracker, lhs),
        Instruction::GreaterThan { lhs } => handler.visit_greater_than(tracker, lhs),
        Instruction::GreaterEqual { lhs } => handler.visit_greater_equal(tracker, lhs),
        Instruction::Jump { offset } => handler.visit_jump(tracker, offset),
        Instruction::JumpIfTrue { offset } => handler.visit_jump_if_true(tracker, offset),
        Instruction::JumpIfFalse { offset } => handler.visit_jump_if_false(tracker, offset),
        Instruction::GetProperty { name } => handler.visit_get_property(tracker, name),
        Instruction::SetProperty { obj, name } => handler.visit_set_property(tracker, obj, name),
        Instruction::GetElement { base } => handler.visit_get_element(tracker, base),
        Instruction::SetElement { base, index } => {
            handler.visit_set_element(tracker, base, index)
        }
        Instruction::CreateArray { first, count } => {
            handler.visit_create_array(tracker, first, count)
        }
        Instruction::Call {
            callee,
            first_arg,
            argc,
        } => handler.visit_call(tracker, callee, first_arg, argc),
        Instruction::GetIterator => handler.visit_get_iterator(tracker),
        Instruction::IteratorNext => handler.visit_iterator_next(tracker),
        Instruction::Throw => handler.visit_throw(tracker),
        Instruction::Return => handler.visit_return(tracker),
    }
}

/// Decodes the whole stream front to back, driving the handler's hooks
/// for every instruction. Returns the tracker so callers can check the
/// final offsets.
pub fn walk<H: BytecodeHandler + ?Sized>(code: &[u8], handler: &mut H) -> EngineResult<OffsetTracker> {
    let mut tracker = OffsetTracker::new();
    let mut offset = 0;
    while offset < code.len() {
        let (instruction, next) = decode_instruction(code, offset)?;
        tracker.advance_to(next);
        let opcode = instruction.opcode();
        if handler.start_instruction(&tracker, opcode) == Verdict::Process {
            dispatch(handler, &tracker, &instruction);
            handler.end_instruction(&tracker, opcode);
        }
        offset = next;
    }
    Ok(tracker)
}

/// Stepwise decoder for consumers that jump.
///
/// The executor cannot use [`walk`] because conditional jumps reposition
/// the stream. The cursor shares the same decode and the same tracker
/// rules, and validates jump targets against the stream bounds.
#[derive(Debug)]
pub struct CodeCursor<'a> {
    code: &'a [u8],
    offset: usize,
    tracker: OffsetTracker,
}

impl<'a> CodeCursor<'a> {
    /// A cursor positioned at the start of the stream.
    pub fn new(code: &'a [u8]) -> Self {
        CodeCursor {
            code,
            offset: 0,
            tracker: OffsetTracker::new(),
        }
    }

    /// Decodes the next instruction, or returns None at end of stream.
    pub fn step(&mut self) -> EngineResult<Option<Instruction>> {
        if self.offset >= self.code.len() {
            return Ok(None);
        }
        let (instruction, next) = decode_instruction(self.code, self.offset)?;
        self.tracker.advance_to(next);
        self.offset = next;
        Ok(Some(instruction))
    }

    /// Offset bookkeeping for the last stepped instruction.
    pub fn tracker(&self) -> &OffsetTracker {
        &self.tracker
    }

    /// Takes a jump whose operand was decoded by the last step.
    ///
    /// The target is resolved against the next instruction offset. A
    /// target outside the stream is malformed bytecode; the end of the
    /// stream itself is a valid target.
    pub fn jump_relative(&mut self, relative: i32) -> EngineResult<()> {
        let target = self.tracker.absolute_offset(relative);
        if target < 0 || target > self.code.len() as i64 {
            return Err(EngineError::internal(format!(
                "jump target {target} outside bytecode of length {}",
                self.code.len()
            ))
            .at_offset(self.tracker.current_instruction_offset()));
        }
        let target = target as usize;
        self.offset = target;
        self.tracker.reset_to(target);
        Ok(())
    }

    /// Current decode position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True when the cursor has consumed the whole stream.
    pub fn at_end(&self) -> bool {
        self.offset >= self.code.len()
    }
}
