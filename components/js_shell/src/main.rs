//! Vesper script engine shell
//!
//! Entry point for the `vesper-js` binary. Parses the command line and
//! delegates to the Runtime for execution.

use clap::Parser;
use heap_manager::GcStats;
use js_shell::{Cli, Runtime, ShellResult};

fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}

fn run(cli: &Cli) -> ShellResult<()> {
    let mut runtime = Runtime::new()?.with_print_bytecode(cli.print_bytecode);

    if let Some(path) = &cli.file {
        let result = runtime.execute_file(path)?;
        if !result.is_undefined() {
            println!("{}", runtime.display(result));
        }
    } else if let Some(source) = &cli.eval {
        let result = runtime.execute_source(source)?;
        if !result.is_undefined() {
            println!("{}", runtime.display(result));
        }
    } else {
        js_shell::repl::run_repl(&mut runtime)?;
    }

    if cli.gc_stats {
        print_gc_stats(runtime.gc_stats());
    }

    Ok(())
}

fn print_gc_stats(stats: &GcStats) {
    eprintln!("gc: {} cycles, {} marked, {} swept, {} barrier marks, peak live {}",
        stats.cycles, stats.objects_marked, stats.objects_swept, stats.barrier_marks,
        stats.peak_live);
}
