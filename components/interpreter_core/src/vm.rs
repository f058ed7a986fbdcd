//! Virtual machine for code unit execution
//!
//! Main entry point for running compiled bytecode over a garbage-collected
//! heap.

use std::collections::HashMap;

use bytecode_stream::CodeUnit;
use heap_manager::{GcConfig, GcStats, Heap};
use value_model::{EngineResult, TaggedValue};

use crate::frame::Frame;
use crate::host::HostFn;

/// Virtual machine for executing code units
///
/// The VM owns the execution state:
/// - The garbage-collected heap all object values live on
/// - Global variables, keyed by name
/// - Host function registry for native calls
/// - Frame stack for code unit activations
///
/// Execution is accumulator-based: most instructions read or write an
/// implicit accumulator and take register operands for further inputs.
/// Garbage collection only ever advances at the polling points inside the
/// dispatch loop, so host functions and instruction handlers can hold
/// heap references across their own internal allocations.
pub struct Vm {
    /// Heap shared by every execution on this VM
    pub(crate) heap: Heap,
    /// Global variables
    pub(crate) globals: HashMap<String, TaggedValue>,
    /// Native functions callable through `Call`
    pub(crate) host_functions: HashMap<String, HostFn>,
    /// Activation frames, innermost last
    pub(crate) frames: Vec<Frame>,
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("live_objects", &self.heap.live_count())
            .field("gc_phase", &self.heap.phase())
            .field("globals", &self.globals.len())
            .field("host_functions", &self.host_functions.len())
            .field("frame_depth", &self.frames.len())
            .finish()
    }
}

impl Vm {
    /// Create a new VM with a default-configured heap
    pub fn new() -> Self {
        Vm::with_config(GcConfig::default())
    }

    /// Create a new VM with explicit heap tuning knobs
    pub fn with_config(config: GcConfig) -> Self {
        Vm {
            heap: Heap::with_config(config),
            globals: HashMap::new(),
            host_functions: HashMap::new(),
            frames: Vec::new(),
        }
    }

    /// Execute a code unit and return the value it produced
    ///
    /// The result is the operand of the first `Return` executed, or the
    /// final accumulator when the instruction stream runs out without one.
    ///
    /// # Example
    ///
    /// ```
    /// use bytecode_stream::{BytecodeWriter, Instruction};
    /// use interpreter_core::Vm;
    ///
    /// let mut writer = BytecodeWriter::new();
    /// writer.emit(Instruction::LoadInt { value: 1 });
    /// writer.emit(Instruction::StoreReg { reg: 0 });
    /// writer.emit(Instruction::LoadInt { value: 2 });
    /// writer.emit(Instruction::Add { lhs: 0 });
    /// writer.emit(Instruction::Return);
    /// let unit = writer.into_unit().unwrap();
    ///
    /// let mut vm = Vm::new();
    /// let result = vm.execute(&unit).unwrap();
    /// assert_eq!(result.as_int32(), Some(3));
    /// ```
    pub fn execute(&mut self, unit: &CodeUnit) -> EngineResult<TaggedValue> {
        self.frames.push(Frame::new(unit.register_count));
        let result = self.run(unit);
        self.frames.pop();
        result
    }

    /// Register a native function under a global name
    ///
    /// Allocates a heap function object carrying the name and binds it as a
    /// global, so bytecode reaches the function with an ordinary
    /// `LoadGlobal` before `Call`. Returns the bound value.
    pub fn register_host_function(
        &mut self,
        name: &str,
        function: HostFn,
    ) -> EngineResult<TaggedValue> {
        self.poll_gc(TaggedValue::undefined());
        let handle = self.heap.alloc_host_function(name)?;
        let value = TaggedValue::from_object(handle);
        self.host_functions.insert(name.to_string(), function);
        self.globals.insert(name.to_string(), value);
        Ok(value)
    }

    /// Set a global variable
    pub fn set_global(&mut self, name: &str, value: TaggedValue) {
        self.globals.insert(name.to_string(), value);
    }

    /// Get a global variable, or `None` if it was never defined
    pub fn get_global(&self, name: &str) -> Option<TaggedValue> {
        self.globals.get(name).copied()
    }

    /// The heap this VM executes against
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the heap, for embedders seeding objects
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Collection statistics accumulated so far
    pub fn gc_stats(&self) -> &GcStats {
        self.heap.stats()
    }

    /// Read a register of the innermost frame.
    pub(crate) fn register(&self, index: usize) -> TaggedValue {
        match self.frames.last() {
            Some(frame) => frame.get(index),
            None => TaggedValue::undefined(),
        }
    }

    /// Write a register of the innermost frame.
    pub(crate) fn set_register(&mut self, index: usize, value: TaggedValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.set(index, value);
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}
