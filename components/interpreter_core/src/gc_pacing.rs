//! Collection pacing from inside the dispatch loop
//!
//! The VM advances garbage collection only at the polling points called
//! from allocating instruction handlers. Between polls the heap never
//! sweeps, so handler-internal temporaries cannot be collected out from
//! under an instruction. Allocations that happen while a cycle is marking
//! are born gray, and the finish step rescans the live roots, which
//! together make the incremental cycle sound against everything the
//! interpreter does between two polls.

use heap_manager::GcPhase;
use value_model::TaggedValue;

use crate::vm::Vm;

impl Vm {
    /// One pacing step, called before each allocating instruction.
    ///
    /// `acc` is the current accumulator, which roots a value that lives in
    /// neither a register nor a global.
    pub(crate) fn poll_gc(&mut self, acc: TaggedValue) {
        match self.heap.phase() {
            GcPhase::Idle => {
                if self.heap.collection_needed() {
                    let roots = self.gc_roots(acc);
                    self.heap.start_incremental(&roots);
                }
            }
            GcPhase::Marking => {
                let budget = self.heap.config().step_budget;
                if !self.heap.mark_step(budget) {
                    let roots = self.gc_roots(acc);
                    self.heap.finish_incremental(&roots);
                }
            }
            GcPhase::Sweeping => {}
        }
    }

    /// Run a full collection cycle now.
    ///
    /// Usable from host functions; the caller's operands are still rooted
    /// by the calling frame's registers.
    pub fn collect_garbage(&mut self) {
        let roots = self.gc_roots(TaggedValue::undefined());
        self.heap.collect_full(&roots);
    }

    /// Every value the VM can still reach: globals, all frame registers,
    /// and the accumulator. Persistent handles are added by the heap
    /// itself.
    fn gc_roots(&self, acc: TaggedValue) -> Vec<TaggedValue> {
        let mut roots: Vec<TaggedValue> = Vec::with_capacity(
            self.globals.len() + self.frames.iter().map(|f| f.registers.len()).sum::<usize>() + 1,
        );
        roots.extend(self.globals.values().copied());
        for frame in &self.frames {
            roots.extend(frame.registers.iter().copied());
        }
        roots.push(acc);
        roots
    }
}
