//! Error types for the shell

use value_model::EngineError;

/// Errors surfaced by the shell and the embedding facade.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Compile or execution failure reported by the engine
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Script file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path as given on the command line
        path: String,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Line editor failure in the REPL
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl ShellError {
    /// Process exit code for this error.
    ///
    /// Script-level failures exit with 1; environment failures (unreadable
    /// file, broken terminal) exit with 2. Usage errors never reach here,
    /// clap exits with 2 on its own.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Engine(_) => 1,
            ShellError::Io { .. } | ShellError::Readline(_) => 2,
        }
    }
}

/// Result type for shell operations
pub type ShellResult<T> = Result<T, ShellError>;
