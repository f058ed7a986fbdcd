//! Shell and embedding facade for the Vesper engine
//!
//! Provides the [`Runtime`] struct that wires the source compiler, the
//! bytecode stream, and the VM together, plus the pieces backing the
//! `vesper-js` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{ShellError, ShellResult};
pub use runtime::Runtime;
