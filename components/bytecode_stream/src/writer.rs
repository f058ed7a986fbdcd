//! Bytecode emission with forward-jump label resolution
//!
//! The writer appends encoded instructions and defers jump operands until
//! [`BytecodeWriter::into_unit`], when every label has a bound offset.
//! Relative offsets are computed against the next-instruction position,
//! matching how the decode loop resolves them.

use value_model::{EngineError, EngineResult};

use crate::chunk::{CodeUnit, Constant};
use crate::opcode::{Instruction, Opcode};

/// A jump target to be bound to a code offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Incremental builder for a [`CodeUnit`].
#[derive(Debug, Default)]
pub struct BytecodeWriter {
    code: Vec<u8>,
    constants: Vec<Constant>,
    names: Vec<String>,
    register_count: u16,
    labels: Vec<Option<usize>>,
    patches: Vec<(usize, Label)>,
}

impl BytecodeWriter {
    /// An empty writer.
    pub fn new() -> Self {
        BytecodeWriter::default()
    }

    /// Appends a fully-resolved instruction.
    pub fn emit(&mut self, instruction: Instruction) {
        if let Some(max) = instruction.max_register() {
            self.register_count = self.register_count.max(max as u16 + 1);
        }
        instruction.encode_into(&mut self.code);
    }

    /// Appends a jump instruction whose operand is patched when the label
    /// is bound. `opcode` must be one of the jump opcodes.
    pub fn emit_jump(&mut self, opcode: Opcode, label: Label) -> EngineResult<()> {
        if !opcode.is_jump() {
            return Err(EngineError::internal(format!(
                "{} takes no jump label",
                opcode.mnemonic()
            )));
        }
        self.code.push(opcode as u8);
        self.patches.push((self.code.len(), label));
        self.code.extend_from_slice(&0i32.to_le_bytes());
        Ok(())
    }

    /// Creates an unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds a label to the current end of code. Binding the same label
    /// twice is a compiler bug.
    pub fn bind_label(&mut self, label: Label) -> EngineResult<()> {
        let slot = &mut self.labels[label.0];
        if slot.is_some() {
            return Err(EngineError::internal("label bound twice"));
        }
        *slot = Some(self.code.len());
        Ok(())
    }

    /// Interns a constant, reusing an existing pool entry when possible.
    pub fn add_constant(&mut self, constant: Constant) -> EngineResult<u16> {
        let found = self.constants.iter().position(|existing| {
            match (existing, &constant) {
                // Bit comparison so NaN literals intern to one entry.
                (Constant::Number(a), Constant::Number(b)) => a.to_bits() == b.to_bits(),
                (a, b) => a == b,
            }
        });
        let index = match found {
            Some(index) => index,
            None => {
                self.constants.push(constant);
                self.constants.len() - 1
            }
        };
        u16::try_from(index)
            .map_err(|_| EngineError::internal("constant pool exceeds u16 indexing"))
    }

    /// Interns a name, reusing an existing pool entry when possible.
    pub fn add_name(&mut self, name: &str) -> EngineResult<u16> {
        let index = match self.names.iter().position(|existing| existing == name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| EngineError::internal("name pool exceeds u16 indexing"))
    }

    /// Raises the frame's register requirement to at least `count`.
    pub fn ensure_registers(&mut self, count: u16) {
        self.register_count = self.register_count.max(count);
    }

    /// Current end-of-code offset.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Patches every jump operand and produces the finished unit. Fails
    /// if any referenced label was never bound.
    pub fn into_unit(self) -> EngineResult<CodeUnit> {
        let BytecodeWriter {
            mut code,
            constants,
            names,
            register_count,
            labels,
            patches,
        } = self;
        for (position, label) in patches {
            let target = labels[label.0]
                .ok_or_else(|| EngineError::internal("jump to unbound label"))?;
            // The operand's four bytes end where the instruction ends.
            let next = position as i64 + 4;
            let relative = i32::try_from(target as i64 - next)
                .map_err(|_| EngineError::internal("jump distance exceeds i32"))?;
            code[position..position + 4].copy_from_slice(&relative.to_le_bytes());
        }
        Ok(CodeUnit {
            code,
            constants,
            names,
            register_count,
        })
    }
}
