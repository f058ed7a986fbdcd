//! Host function plumbing

use value_model::{EngineResult, TaggedValue};

use crate::vm::Vm;

/// Signature of a native function callable from bytecode.
///
/// Receives the VM (for heap access and reentrant execution), the `this`
/// receiver, and the argument window copied out of the caller's registers.
/// Arguments are plain values; any heap references among them stay alive
/// for the duration of the call because the caller's registers still hold
/// them and remain part of the root set.
pub type HostFn = fn(&mut Vm, TaggedValue, &[TaggedValue]) -> EngineResult<TaggedValue>;
