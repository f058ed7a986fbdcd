//! Runtime orchestration for script execution
//!
//! The Runtime struct wires the pipeline components together:
//! - source_compiler for source-to-bytecode compilation
//! - interpreter_core::Vm for execution over the collected heap
//! - bytecode_stream's disassembler for listing output
//!
//! One Runtime owns one VM, so successive executions share globals and
//! heap state the way a REPL session expects.

use bytecode_stream::{CodeUnit, Disassembler};
use heap_manager::{GcStats, Heap};
use interpreter_core::Vm;
use value_model::{EngineError, EngineResult, TaggedValue};

use crate::error::{ShellError, ShellResult};

/// Engine instance behind the shell
pub struct Runtime {
    /// Whether to print bytecode before execution
    print_bytecode: bool,
    /// Persistent VM instance holding globals and the heap
    vm: Vm,
}

impl Runtime {
    /// Create a runtime with the standard host functions installed.
    ///
    /// Seeds `print` and `gc`, plus the `newSet` and `newMap` builders
    /// scripts use to obtain host collections.
    ///
    /// # Errors
    /// Fails only when seeding a host function cell exhausts the heap,
    /// which a freshly configured heap cannot do in practice.
    ///
    /// # Example
    /// ```
    /// use js_shell::Runtime;
    ///
    /// let mut runtime = Runtime::new().unwrap();
    /// let result = runtime.execute_source("1 + 2").unwrap();
    /// assert_eq!(result.as_int32(), Some(3));
    /// ```
    pub fn new() -> ShellResult<Self> {
        let mut vm = Vm::new();
        install_host_functions(&mut vm)?;
        Ok(Runtime {
            print_bytecode: false,
            vm,
        })
    }

    /// Enable bytecode printing
    pub fn with_print_bytecode(mut self, enabled: bool) -> Self {
        self.print_bytecode = enabled;
        self
    }

    /// Execute a script file
    ///
    /// # Errors
    /// Returns `ShellError::Io` when the file cannot be read, or the
    /// engine error when compilation or execution fails.
    pub fn execute_file(&mut self, path: &str) -> ShellResult<TaggedValue> {
        let source = std::fs::read_to_string(path).map_err(|source| ShellError::Io {
            path: path.to_string(),
            source,
        })?;
        self.execute_source(&source)
    }

    /// Compile and execute source text
    ///
    /// Returns the script's completion value: the value of the final
    /// expression statement, or undefined when the program ends with a
    /// declaration or other non-expression statement.
    pub fn execute_source(&mut self, source: &str) -> ShellResult<TaggedValue> {
        let unit = source_compiler::compile(source)?;
        if self.print_bytecode {
            print!("{}", Disassembler::disassemble(&unit)?);
        }
        Ok(self.vm.execute(&unit)?)
    }

    /// Execute a precompiled code unit
    ///
    /// Embedders that cache compiled units skip the source pipeline and
    /// run them directly against this runtime's heap and globals.
    pub fn execute_unit(&mut self, unit: &CodeUnit) -> ShellResult<TaggedValue> {
        Ok(self.vm.execute(unit)?)
    }

    /// Collection statistics accumulated so far
    pub fn gc_stats(&self) -> &GcStats {
        self.vm.gc_stats()
    }

    /// Render a value the way script ToString would
    pub fn display(&self, value: TaggedValue) -> String {
        self.vm.heap().to_display_string(value)
    }

    /// The heap backing this runtime
    pub fn heap(&self) -> &Heap {
        self.vm.heap()
    }

    /// Access the VM for direct embedding use
    pub fn vm(&mut self) -> &mut Vm {
        &mut self.vm
    }

    /// Check if bytecode printing is enabled
    pub fn is_print_bytecode_enabled(&self) -> bool {
        self.print_bytecode
    }
}

fn install_host_functions(vm: &mut Vm) -> EngineResult<()> {
    vm.register_host_function("print", host_print)?;
    vm.register_host_function("gc", host_gc)?;
    vm.register_host_function("newSet", host_new_set)?;
    vm.register_host_function("newMap", host_new_map)?;
    Ok(())
}

/// Print the arguments separated by spaces, followed by a newline.
fn host_print(vm: &mut Vm, _this: TaggedValue, args: &[TaggedValue]) -> EngineResult<TaggedValue> {
    let mut line = String::new();
    for (i, &arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&vm.heap().to_display_string(arg));
    }
    println!("{line}");
    Ok(TaggedValue::undefined())
}

/// Run a full collection cycle immediately.
fn host_gc(vm: &mut Vm, _this: TaggedValue, _args: &[TaggedValue]) -> EngineResult<TaggedValue> {
    vm.collect_garbage();
    Ok(TaggedValue::undefined())
}

/// Build a Set from the argument list; duplicate entries collapse.
fn host_new_set(
    vm: &mut Vm,
    _this: TaggedValue,
    args: &[TaggedValue],
) -> EngineResult<TaggedValue> {
    let set = vm.heap_mut().alloc_set()?;
    for &value in args {
        vm.heap_mut().set_add(set, value)?;
    }
    Ok(TaggedValue::from_object(set))
}

/// Build a Map from a flat key/value argument list.
fn host_new_map(
    vm: &mut Vm,
    _this: TaggedValue,
    args: &[TaggedValue],
) -> EngineResult<TaggedValue> {
    if args.len() % 2 != 0 {
        return Err(EngineError::type_error("newMap takes key/value pairs"));
    }
    let map = vm.heap_mut().alloc_map()?;
    for pair in args.chunks_exact(2) {
        vm.heap_mut().map_set(map, pair[0], pair[1])?;
    }
    Ok(TaggedValue::from_object(map))
}
