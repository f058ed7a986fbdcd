//! Bytecode virtual machine for the Vesper engine
//!
//! This crate provides the accumulator-based execution core:
//! - A dispatch loop decoding instructions straight from the byte stream
//! - Register frames sized by the code unit being run
//! - Garbage collection paced at allocating instructions, with the
//!   accumulator, frame registers, and globals as the root set
//! - Host function registration for native calls from bytecode
//!
//! # Example
//!
//! ```
//! use bytecode_stream::{BytecodeWriter, Instruction};
//! use interpreter_core::Vm;
//!
//! let mut writer = BytecodeWriter::new();
//! writer.emit(Instruction::LoadInt { value: 1 });
//! writer.emit(Instruction::StoreReg { reg: 0 });
//! writer.emit(Instruction::LoadInt { value: 2 });
//! writer.emit(Instruction::Add { lhs: 0 });
//! writer.emit(Instruction::Return);
//! let unit = writer.into_unit().unwrap();
//!
//! let mut vm = Vm::new();
//! let result = vm.execute(&unit).unwrap();
//! assert_eq!(result.as_int32(), Some(3));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frame;
pub mod host;
pub mod vm;

mod dispatch;
mod gc_pacing;

// Re-export main types at crate root
pub use frame::Frame;
pub use host::HostFn;
pub use vm::Vm;
