//! Bytecode stream format and decode loop
//!
//! This crate defines the accumulator/register instruction set, the byte
//! encoding of an instruction stream, and the decode/dispatch skeleton
//! shared by every consumer of bytecode.
//!
//! # Features
//!
//! - Fixed-arity instruction encoding with u8 opcode tags
//! - Single-step decode with precise offset bookkeeping
//! - A two-hook handler trait so executors, disassemblers, and analyzers
//!   share one decode loop
//! - A writer that resolves forward jump labels
//!
//! # Example
//!
//! ```
//! use bytecode_stream::{BytecodeWriter, CodeCursor, Instruction};
//!
//! let mut writer = BytecodeWriter::new();
//! writer.emit(Instruction::LoadInt { value: 7 });
//! writer.emit(Instruction::Return);
//! let unit = writer.into_unit().unwrap();
//!
//! let mut cursor = CodeCursor::new(&unit.code);
//! let first = cursor.step().unwrap().unwrap();
//! assert_eq!(first, Instruction::LoadInt { value: 7 });
//! assert_eq!(cursor.tracker().next_instruction_offset(), 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod decode;
pub mod disasm;
pub mod opcode;
pub mod writer;

// Re-export main types at crate root
pub use chunk::{CodeUnit, Constant};
pub use decode::{decode_instruction, walk, BytecodeHandler, CodeCursor, OffsetTracker, Verdict};
pub use disasm::Disassembler;
pub use opcode::{Instruction, Opcode};
pub use writer::{BytecodeWriter, Label};
