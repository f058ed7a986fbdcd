//! Incremental mark-and-sweep collection driver.
//!
//! State machine: Idle -> Marking -> Sweeping -> Idle. Marking is
//! incremental with work-based budgets; sweep runs as one step after a
//! final root rescan. Everything executes on the mutator thread; the
//! interpreter's allocation sites and the embedding's explicit collection
//! requests decide pacing. A cycle, once started, always runs to
//! completion.

use value_model::{HeapRef, TaggedValue};

use crate::heap::Heap;

/// Collector phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    /// No cycle in progress.
    Idle,
    /// Mark stack is live; the write barrier is armed.
    Marking,
    /// Unmarked cells are being reclaimed.
    Sweeping,
}

/// Collector tuning knobs.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Hard cell capacity; allocation beyond it fails.
    pub max_objects: usize,
    /// Live-cell count that first makes `collection_needed` fire.
    pub initial_gc_threshold: usize,
    /// Threshold growth after each cycle, relative to surviving cells.
    pub growth_factor: f64,
    /// Cells traced per mark step when the driver picks the budget.
    pub step_budget: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            max_objects: 1 << 20,
            initial_gc_threshold: 256,
            growth_factor: 1.5,
            step_budget: 64,
        }
    }
}

/// Cumulative collection statistics.
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Completed cycles.
    pub cycles: u64,
    /// Cells marked, deduplicated by the mark bit.
    pub objects_marked: u64,
    /// Cells reclaimed by sweep.
    pub objects_swept: u64,
    /// Mark steps executed.
    pub mark_steps: u64,
    /// Barrier slow-path stores that carried a heap reference.
    pub barrier_marks: u64,
    /// Highest live-cell count observed.
    pub peak_live: usize,
}

impl Heap {
    /// True when allocation pressure calls for starting a cycle.
    pub fn collection_needed(&self) -> bool {
        self.phase == GcPhase::Idle && self.live_count >= self.next_gc_threshold
    }

    /// Starts a marking cycle from the given roots plus the persistent
    /// handle table. Returns false (and does nothing) if a cycle is
    /// already in progress.
    pub fn start_incremental(&mut self, roots: &[TaggedValue]) -> bool {
        if self.phase != GcPhase::Idle {
            return false;
        }
        self.phase = GcPhase::Marking;
        self.push_roots(roots);
        true
    }

    /// Traces up to `budget` cells off the mark stack. Returns true while
    /// marking work remains.
    pub fn mark_step(&mut self, budget: usize) -> bool {
        if self.phase != GcPhase::Marking {
            return false;
        }
        let mut children: Vec<HeapRef> = Vec::new();
        let mut traced = 0usize;
        while traced < budget {
            let Some(r) = self.mark_stack.pop() else {
                break;
            };
            children.clear();
            if let Ok(cell) = self.get(r) {
                cell.data.trace(|child| children.push(child));
            }
            for &child in &children {
                self.mark_and_push(child);
            }
            traced += 1;
        }
        self.stats.mark_steps += 1;
        !self.mark_stack.is_empty()
    }

    /// Completes the cycle: rescans roots, drains the mark stack, sweeps.
    ///
    /// The rescan is required for soundness. Values can move into caller
    /// root slots (registers, globals) after the cycle started, and there
    /// is no deletion barrier to catch references leaving the heap graph
    /// into native hands.
    pub fn finish_incremental(&mut self, roots: &[TaggedValue]) {
        if self.phase != GcPhase::Marking {
            return;
        }
        self.push_roots(roots);
        while self.mark_step(self.config.step_budget) {}
        self.sweep();
    }

    /// An entire collection cycle in one call.
    pub fn collect_full(&mut self, roots: &[TaggedValue]) {
        if self.phase == GcPhase::Idle {
            self.start_incremental(roots);
        }
        if self.phase == GcPhase::Marking {
            while self.mark_step(self.config.step_budget) {}
            self.finish_incremental(roots);
        }
    }

    fn push_roots(&mut self, roots: &[TaggedValue]) {
        for &root in roots {
            if let Some(r) = root.as_object() {
                self.mark_and_push(r);
            }
        }
        for root in self.persistent_root_values() {
            if let Some(r) = root.as_object() {
                self.mark_and_push(r);
            }
        }
    }

    /// Reclaims every unmarked cell and clears survivor mark bits.
    fn sweep(&mut self) {
        self.phase = GcPhase::Sweeping;
        let mut swept = 0u64;
        for index in 0..self.slots.len() {
            let keep = match &mut self.slots[index] {
                Some(cell) if cell.header.marked => {
                    cell.header.marked = false;
                    true
                }
                Some(_) => false,
                None => true,
            };
            if !keep {
                self.slots[index] = None;
                self.free_list.push(index as u32);
                self.live_count -= 1;
                swept += 1;
            }
        }
        self.mark_stack.clear();
        self.stats.objects_swept += swept;
        self.stats.cycles += 1;
        self.next_gc_threshold = ((self.live_count as f64 * self.config.growth_factor) as usize)
            .max(self.config.initial_gc_threshold);
        self.phase = GcPhase::Idle;
    }
}
