//! Engine error type and pending-exception signal.
//!
//! Every fallible engine operation returns [`EngineResult`]. An `Err` is the
//! "exception pending" signal a native caller observes; script-level `throw`
//! and host-raised type errors both travel through it.

use std::fmt;

/// The kind of script error.
///
/// These correspond to the script-visible built-in error constructors, plus
/// an internal kind for conditions with no script-level recovery (allocator
/// exhaustion, malformed bytecode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic error; also carries values raised by script `throw`
    Error,
    /// Wrong receiver or operand kind
    TypeError,
    /// Value out of allowed range
    RangeError,
    /// Reference to an undefined binding
    ReferenceError,
    /// Malformed source text
    SyntaxError,
    /// Internal engine error; not recoverable at script level
    InternalError,
}

impl ErrorKind {
    /// The script-visible constructor name.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

/// A pending script exception.
///
/// `offset` is the byte offset of the faulting instruction when the error was
/// raised during bytecode execution; the decode loop's offset bookkeeping
/// supplies it so diagnostics can point back into the instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Bytecode offset of the faulting instruction, when known
    pub offset: Option<usize>,
}

impl EngineError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
            offset: None,
        }
    }

    /// A generic `Error`, as produced by script `throw`.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// A `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// A `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// A `ReferenceError`.
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReferenceError, message)
    }

    /// A `SyntaxError`.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    /// An `InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Attributes the error to a bytecode offset, keeping an earlier
    /// attribution if one exists.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset.get_or_insert(offset);
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " (at bytecode offset {offset})")?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {}

/// Result alias used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;
