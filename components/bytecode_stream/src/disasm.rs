//! Bytecode disassembler
//!
//! A [`BytecodeHandler`] that renders one line per instruction, with pool
//! operands resolved against the code unit. Jump targets are shown as
//! absolute offsets so control flow can be followed by eye.

use value_model::{number_to_string, EngineResult};

use crate::chunk::{CodeUnit, Constant};
use crate::decode::{walk, BytecodeHandler, OffsetTracker};

/// Formats a code unit one instruction per line.
pub struct Disassembler<'a> {
    unit: &'a CodeUnit,
    lines: Vec<String>,
}

impl<'a> Disassembler<'a> {
    /// A disassembler for the given unit.
    pub fn new(unit: &'a CodeUnit) -> Self {
        Disassembler {
            unit,
            lines: Vec::new(),
        }
    }

    /// Decodes the unit's whole stream and returns the listing.
    pub fn disassemble(unit: &'a CodeUnit) -> EngineResult<String> {
        let mut disassembler = Disassembler::new(unit);
        walk(&unit.code, &mut disassembler)?;
        Ok(disassembler.finish())
    }

    /// The accumulated listing.
    pub fn finish(self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn push(&mut self, tracker: &OffsetTracker, text: String) {
        self.lines
            .push(format!("{:>5}  {}", tracker.current_instruction_offset(), text));
    }

    fn constant_text(&self, index: u16) -> String {
        match self.unit.constant(index) {
            Ok(Constant::Number(n)) => number_to_string(*n),
            Ok(Constant::String(s)) => format!("{s:?}"),
            Ok(Constant::Bool(b)) => b.to_string(),
            Ok(Constant::Null) => "null".to_string(),
            Ok(Constant::Undefined) => "undefined".to_string(),
            Err(_) => "<bad constant index>".to_string(),
        }
    }

    fn name_text(&self, index: u16) -> String {
        match self.unit.name(index) {
            Ok(name) => name.to_string(),
            Err(_) => "<bad name index>".to_string(),
        }
    }
}

impl BytecodeHandler for Disassembler<'_> {
    fn visit_load_const(&mut self, tracker: &OffsetTracker, index: u16) {
        let text = format!("LoadConst {} ; {}", index, self.constant_text(index));
        self.push(tracker, text);
    }

    fn visit_load_int(&mut self, tracker: &OffsetTracker, value: i32) {
        self.push(tracker, format!("LoadInt {value}"));
    }

    fn visit_load_undefined(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "LoadUndefined".to_string());
    }

    fn visit_load_null(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "LoadNull".to_string());
    }

    fn visit_load_true(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "LoadTrue".to_string());
    }

    fn visit_load_false(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "LoadFalse".to_string());
    }

    fn visit_load_reg(&mut self, tracker: &OffsetTracker, reg: u8) {
        self.push(tracker, format!("LoadReg r{reg}"));
    }

    fn visit_store_reg(&mut self, tracker: &OffsetTracker, reg: u8) {
        self.push(tracker, format!("StoreReg r{reg}"));
    }

    fn visit_load_global(&mut self, tracker: &OffsetTracker, name: u16) {
        let text = format!("LoadGlobal {} ; {}", name, self.name_text(name));
        self.push(tracker, text);
    }

    fn visit_store_global(&mut self, tracker: &OffsetTracker, name: u16) {
        let text = format!("StoreGlobal {} ; {}", name, self.name_text(name));
        self.push(tracker, text);
    }

    fn visit_add(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Add r{lhs}"));
    }

    fn visit_sub(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Sub r{lhs}"));
    }

    fn visit_mul(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Mul r{lhs}"));
    }

    fn visit_div(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Div r{lhs}"));
    }

    fn visit_mod(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Mod r{lhs}"));
    }

    fn visit_neg(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "Neg".to_string());
    }

    fn visit_not(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "Not".to_string());
    }

    fn visit_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("Equal r{lhs}"));
    }

    fn visit_not_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("NotEqual r{lhs}"));
    }

    fn visit_strict_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("StrictEqual r{lhs}"));
    }

    fn visit_strict_not_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("StrictNotEqual r{lhs}"));
    }

    fn visit_less_than(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("LessThan r{lhs}"));
    }

    fn visit_less_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("LessEqual r{lhs}"));
    }

    fn visit_greater_than(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("GreaterThan r{lhs}"));
    }

    fn visit_greater_equal(&mut self, tracker: &OffsetTracker, lhs: u8) {
        self.push(tracker, format!("GreaterEqual r{lhs}"));
    }

    fn visit_jump(&mut self, tracker: &OffsetTracker, offset: i32) {
        let text = format!("Jump {:+} -> {}", offset, tracker.absolute_offset(offset));
        self.push(tracker, text);
    }

    fn visit_jump_if_true(&mut self, tracker: &OffsetTracker, offset: i32) {
        let text = format!(
            "JumpIfTrue {:+} -> {}",
            offset,
            tracker.absolute_offset(offset)
        );
        self.push(tracker, text);
    }

    fn visit_jump_if_false(&mut self, tracker: &OffsetTracker, offset: i32) {
        let text = format!(
            "JumpIfFalse {:+} -> {}",
            offset,
            tracker.absolute_offset(offset)
        );
        self.push(tracker, text);
    }

    fn visit_get_property(&mut self, tracker: &OffsetTracker, name: u16) {
        let text = format!("GetProperty {} ; {}", name, self.name_text(name));
        self.push(tracker, text);
    }

    fn visit_set_property(&mut self, tracker: &OffsetTracker, obj: u8, name: u16) {
        let text = format!("SetProperty r{obj} {} ; {}", name, self.name_text(name));
        self.push(tracker, text);
    }

    fn visit_get_element(&mut self, tracker: &OffsetTracker, base: u8) {
        self.push(tracker, format!("GetElement r{base}"));
    }

    fn visit_set_element(&mut self, tracker: &OffsetTracker, base: u8, index: u8) {
        self.push(tracker, format!("SetElement r{base} r{index}"));
    }

    fn visit_create_array(&mut self, tracker: &OffsetTracker, first: u8, count: u8) {
        self.push(tracker, format!("CreateArray r{first} n={count}"));
    }

    fn visit_call(&mut self, tracker: &OffsetTracker, callee: u8, first_arg: u8, argc: u8) {
        self.push(
            tracker,
            format!("Call r{callee} args=r{first_arg}.. argc={argc}"),
        );
    }

    fn visit_get_iterator(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "GetIterator".to_string());
    }

    fn visit_iterator_next(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "IteratorNext".to_string());
    }

    fn visit_throw(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "Throw".to_string());
    }

    fn visit_return(&mut self, tracker: &OffsetTracker) {
        self.push(tracker, "Return".to_string());
    }
}
