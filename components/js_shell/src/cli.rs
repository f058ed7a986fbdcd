//! Command line interface definition

use clap::Parser;

/// Command line options for the `vesper-js` binary.
///
/// With no file and no `--eval` the shell starts an interactive REPL.
#[derive(Debug, Clone, Parser)]
#[command(name = "vesper-js", version, about = "Vesper script engine shell")]
pub struct Cli {
    /// Script file to execute
    pub file: Option<String>,

    /// Evaluate the given source text instead of a file
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    pub eval: Option<String>,

    /// Print the bytecode listing before executing
    #[arg(long)]
    pub print_bytecode: bool,

    /// Report collector statistics after execution
    #[arg(long)]
    pub gc_stats: bool,
}
