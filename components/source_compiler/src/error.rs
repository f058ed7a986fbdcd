//! Parser error helpers

use value_model::EngineError;

use crate::lexer::{Position, Token};

/// Create a syntax error carrying the source position in its message.
pub fn syntax_error(message: impl Into<String>, position: Position) -> EngineError {
    EngineError::syntax_error(format!("{} at {}", message.into(), position))
}

/// Create an "expected X, got Y" error.
pub fn unexpected_token(expected: &str, got: &Token, position: Position) -> EngineError {
    syntax_error(format!("Expected {expected}, got {got}"), position)
}
