//! REPL (Read-Eval-Print Loop) implementation

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use value_model::{ErrorKind, TaggedValue};

use crate::error::{ShellError, ShellResult};
use crate::runtime::Runtime;

/// Run the interactive REPL until the user exits.
///
/// Globals persist across inputs, so `x = 1` on one line is visible to the
/// next. Input spanning several lines is accumulated until its brackets
/// balance.
pub fn run_repl(runtime: &mut Runtime) -> ShellResult<()> {
    let mut editor = DefaultEditor::new()?;

    println!("Vesper script shell v{}", env!("CARGO_PKG_VERSION"));
    println!("Type an expression, or '.help' for commands.");
    println!();

    let mut line_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "... " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline && (trimmed == "exit" || trimmed == "quit" || trimmed == ".exit")
                {
                    break;
                }

                if !in_multiline && trimmed.starts_with('.') {
                    handle_repl_command(trimmed, runtime);
                    continue;
                }

                if in_multiline {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                if !is_input_complete(&line_buffer) {
                    in_multiline = true;
                    continue;
                }
                in_multiline = false;

                let _ = editor.add_history_entry(&line_buffer);

                match runtime.execute_source(&line_buffer) {
                    Ok(value) => {
                        println!("{}", format_value(runtime, value));
                    }
                    Err(ShellError::Engine(error))
                        if error.kind == ErrorKind::SyntaxError
                            && error.message.contains("end of input") =>
                    {
                        // The statement ran out before its end; keep reading.
                        in_multiline = true;
                        continue;
                    }
                    Err(error) => {
                        eprintln!("{error}");
                    }
                }

                line_buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("^C");
                    line_buffer.clear();
                    in_multiline = false;
                } else {
                    println!("Press Ctrl-D or type 'exit' to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(error) => return Err(ShellError::Readline(error)),
        }
    }

    Ok(())
}

/// Handle dot-prefixed REPL commands.
fn handle_repl_command(command: &str, runtime: &Runtime) {
    match command {
        ".help" => {
            println!("REPL commands:");
            println!("  .help     - Show this help message");
            println!("  .clear    - Clear the screen");
            println!("  .gc       - Show collector statistics");
            println!("  .exit     - Exit the REPL");
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        ".gc" => {
            let stats = runtime.gc_stats();
            println!("cycles:         {}", stats.cycles);
            println!("objects marked: {}", stats.objects_marked);
            println!("objects swept:  {}", stats.objects_swept);
            println!("mark steps:     {}", stats.mark_steps);
            println!("barrier marks:  {}", stats.barrier_marks);
            println!("peak live:      {}", stats.peak_live);
            println!("live now:       {}", runtime.heap().live_count());
        }
        _ => {
            println!("Unknown command: {command}");
            println!("Type .help for available commands");
        }
    }
}

/// Check whether the accumulated input looks complete.
///
/// Counts bracket nesting outside string literals. Strings cannot span
/// lines in this language, so an unterminated string still reads as
/// complete and the error surfaces immediately instead of swallowing
/// further input.
fn is_input_complete(input: &str) -> bool {
    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut paren_count = 0i32;
    let mut in_string = false;
    let mut string_char = ' ';
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            if c == '\\' {
                escape_next = true;
            } else if c == string_char || c == '\n' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = true;
                string_char = c;
            }
            '{' => brace_count += 1,
            '}' => brace_count -= 1,
            '[' => bracket_count += 1,
            ']' => bracket_count -= 1,
            '(' => paren_count += 1,
            ')' => paren_count -= 1,
            _ => {}
        }
    }

    brace_count <= 0 && bracket_count <= 0 && paren_count <= 0
}

/// Format a result value for display at the prompt.
///
/// Strings are quoted so `'3'` and `3` stay distinguishable; everything
/// else renders like script ToString.
fn format_value(runtime: &Runtime, value: TaggedValue) -> String {
    let heap = runtime.heap();
    if let Some(r) = value.as_object() {
        if matches!(heap.kind_of(r), Ok(heap_manager::ObjectKind::String)) {
            return format!("'{}'", heap.to_display_string(value));
        }
    }
    heap.to_display_string(value)
}
