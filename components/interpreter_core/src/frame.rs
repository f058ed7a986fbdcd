//! Register frame for one code unit activation

use value_model::TaggedValue;

/// Register file for one executing code unit.
///
/// Registers hold local variables and expression temporaries. Every live
/// value the executor holds outside the accumulator lives here, which is
/// what makes the frame a complete root set for the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Register file, indexed by instruction register operands
    pub registers: Vec<TaggedValue>,
}

impl Frame {
    /// A frame with `count` registers, all undefined.
    pub fn new(count: u16) -> Self {
        Frame {
            registers: vec![TaggedValue::undefined(); count as usize],
        }
    }

    /// Get register value
    pub fn get(&self, index: usize) -> TaggedValue {
        self.registers
            .get(index)
            .copied()
            .unwrap_or_else(TaggedValue::undefined)
    }

    /// Set register value
    pub fn set(&mut self, index: usize, value: TaggedValue) {
        if index >= self.registers.len() {
            self.registers.resize(index + 1, TaggedValue::undefined());
        }
        self.registers[index] = value;
    }
}
