//! Source-to-bytecode compiler for the embedding subset
//!
//! Compiles a small scripting subset (expression statements, `var`,
//! assignment, `if`/`else`, `while`, `for..of`, blocks, `throw`, array
//! literals, property and index access, calls) into a
//! [`bytecode_stream::CodeUnit`]. The value of a program's last
//! expression statement is its result, which is what an evaluate-style
//! embedding expects.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes subset source code
//! - [`Parser`] - Recursive descent parser producing the syntax tree
//! - [`BytecodeGenerator`] - Converts the syntax tree to bytecode
//! - [`compile`] - One-call source-to-unit convenience
//!
//! # Example
//!
//! ```
//! use source_compiler::compile;
//!
//! let unit = compile("var x = 2; x * 3").unwrap();
//! assert!(!unit.code.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bytecode_gen;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Expression, Literal, Program, Statement};
pub use bytecode_gen::BytecodeGenerator;
pub use lexer::{Keyword, Lexer, Position, Punctuator, Token};
pub use parser::Parser;

use bytecode_stream::CodeUnit;
use value_model::EngineResult;

/// Compiles subset source into an executable code unit.
pub fn compile(source: &str) -> EngineResult<CodeUnit> {
    let program = Parser::new(source).parse()?;
    BytecodeGenerator::new().generate(&program)
}
