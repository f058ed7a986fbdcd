//! Compiled code unit: instruction bytes plus pools
//!
//! A code unit is the compiler-to-executor hand-off. The byte layout of
//! `code` is internal to this workspace, not a stable interchange format.

use value_model::{EngineError, EngineResult};

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Numeric literal too wide for an inline int32 operand
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Bool(bool),
    /// Null literal
    Null,
    /// Undefined literal
    Undefined,
}

/// A compiled instruction stream with its constant and name pools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeUnit {
    /// Encoded instruction bytes
    pub code: Vec<u8>,
    /// Constant pool, indexed by LoadConst operands
    pub constants: Vec<Constant>,
    /// Name pool for globals and properties
    pub names: Vec<String>,
    /// Registers the frame must provide; register operands are u8, so a
    /// frame never needs more than 256
    pub register_count: u16,
}

impl CodeUnit {
    /// An empty code unit.
    pub fn new() -> Self {
        CodeUnit::default()
    }

    /// Resolves a constant-pool operand.
    pub fn constant(&self, index: u16) -> EngineResult<&Constant> {
        self.constants.get(index as usize).ok_or_else(|| {
            EngineError::internal(format!("constant index {index} out of range"))
        })
    }

    /// Resolves a name-pool operand.
    pub fn name(&self, index: u16) -> EngineResult<&str> {
        self.names
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| EngineError::internal(format!("name index {index} out of range")))
    }
}
