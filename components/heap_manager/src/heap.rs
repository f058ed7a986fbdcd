//! The heap: object-table allocator, write barrier, and typed mutation API.
//!
//! The heap is an explicit context object threaded through the interpreter
//! and the embedding surface; independent engines own independent heaps.
//! Every store of a value into a heap object's field goes through the
//! mutation methods here, which perform the write barrier. There is no other
//! mutation path, so no heap-to-heap reference store can bypass the check.

use std::cell::RefCell;
use std::rc::Rc;

use value_model::{number_to_string, EngineError, EngineResult, HeapRef, TaggedValue, Variant};

use crate::collector::{GcConfig, GcPhase, GcStats};
use crate::mark_stack::MarkStack;
use crate::object::{
    CollectionIterator, HeapData, ObjectCell, ObjectData, ObjectKind, StringIteratorState,
};
use crate::roots::{PersistentHandle, RootTable};

/// Upper bound on dense-array growth through `array_set`.
const MAX_ARRAY_LENGTH: u32 = 1 << 26;

/// Garbage-collected heap.
pub struct Heap {
    pub(crate) slots: Vec<Option<ObjectCell>>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) live_count: usize,
    pub(crate) phase: GcPhase,
    pub(crate) mark_stack: MarkStack,
    pub(crate) roots: Rc<RefCell<RootTable>>,
    pub(crate) config: GcConfig,
    pub(crate) stats: GcStats,
    pub(crate) next_gc_threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl Heap {
    /// A heap with default configuration.
    pub fn new() -> Self {
        Heap::with_config(GcConfig::default())
    }

    /// A heap with explicit tuning knobs.
    pub fn with_config(config: GcConfig) -> Self {
        let next_gc_threshold = config.initial_gc_threshold;
        Heap {
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
            phase: GcPhase::Idle,
            mark_stack: MarkStack::new(),
            roots: Rc::new(RefCell::new(RootTable::default())),
            config,
            stats: GcStats::default(),
            next_gc_threshold,
        }
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocates a cell. Fails only on capacity exhaustion, which is fatal
    /// to the current top-level execution; there is no script-level
    /// recovery.
    ///
    /// Cells allocated while marking is in progress enter the cycle gray:
    /// born marked and queued for tracing, so neither the cell nor anything
    /// it already references can be missed by the in-flight cycle.
    pub fn alloc(&mut self, data: HeapData) -> EngineResult<HeapRef> {
        if self.live_count >= self.config.max_objects {
            return Err(EngineError::internal(format!(
                "heap exhausted: {} objects live at capacity",
                self.live_count
            )));
        }
        let during_marking = self.phase == GcPhase::Marking;
        let cell = ObjectCell::new(data, during_marking);
        let index = match self.free_list.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(cell);
                index
            }
            None => {
                self.slots.push(Some(cell));
                (self.slots.len() - 1) as u32
            }
        };
        self.live_count += 1;
        if self.live_count > self.stats.peak_live {
            self.stats.peak_live = self.live_count;
        }
        let r = HeapRef::new(index);
        if during_marking {
            self.mark_stack.push(r);
            self.stats.objects_marked += 1;
        }
        Ok(r)
    }

    /// Allocates an empty plain object.
    pub fn alloc_object(&mut self) -> EngineResult<HeapRef> {
        self.alloc(HeapData::Object(Default::default()))
    }

    /// Allocates a dense array from the given elements.
    pub fn alloc_array(&mut self, elements: Vec<TaggedValue>) -> EngineResult<HeapRef> {
        self.alloc(HeapData::Array(elements))
    }

    /// Allocates a string from UTF-16 code units.
    pub fn alloc_string(&mut self, units: Vec<u16>) -> EngineResult<HeapRef> {
        self.alloc(HeapData::String(units))
    }

    /// Allocates a string from Rust text.
    pub fn alloc_string_from_str(&mut self, text: &str) -> EngineResult<HeapRef> {
        self.alloc(HeapData::String(text.encode_utf16().collect()))
    }

    /// Allocates an empty map.
    pub fn alloc_map(&mut self) -> EngineResult<HeapRef> {
        self.alloc(HeapData::Map(Vec::new()))
    }

    /// Allocates an empty set.
    pub fn alloc_set(&mut self) -> EngineResult<HeapRef> {
        self.alloc(HeapData::Set(Vec::new()))
    }

    /// Allocates an array, map, or set iterator cell of the given kind.
    pub fn alloc_collection_iterator(
        &mut self,
        kind: ObjectKind,
        state: CollectionIterator,
    ) -> EngineResult<HeapRef> {
        let data = match kind {
            ObjectKind::ArrayIterator => HeapData::ArrayIterator(state),
            ObjectKind::MapIterator => HeapData::MapIterator(state),
            ObjectKind::SetIterator => HeapData::SetIterator(state),
            other => {
                return Err(EngineError::internal(format!(
                    "{} is not a collection iterator kind",
                    other.as_str()
                )))
            }
        };
        self.alloc(data)
    }

    /// Allocates a string iterator cell.
    pub fn alloc_string_iterator(&mut self, state: StringIteratorState) -> EngineResult<HeapRef> {
        self.alloc(HeapData::StringIterator(state))
    }

    /// Allocates a host function cell dispatched by registry name.
    pub fn alloc_host_function(&mut self, name: &str) -> EngineResult<HeapRef> {
        self.alloc(HeapData::HostFunction(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Cell access
    // ------------------------------------------------------------------

    /// Reads a cell.
    pub fn get(&self, r: HeapRef) -> EngineResult<&ObjectCell> {
        self.slots
            .get(r.as_usize())
            .and_then(Option::as_ref)
            .ok_or_else(|| EngineError::internal(format!("dangling heap reference {}", r.index())))
    }

    pub(crate) fn get_mut(&mut self, r: HeapRef) -> EngineResult<&mut ObjectCell> {
        self.slots
            .get_mut(r.as_usize())
            .and_then(Option::as_mut)
            .ok_or_else(|| EngineError::internal(format!("dangling heap reference {}", r.index())))
    }

    /// True while the cell is live (allocated and not yet swept).
    pub fn contains(&self, r: HeapRef) -> bool {
        matches!(self.slots.get(r.as_usize()), Some(Some(_)))
    }

    /// The header kind tag of a cell.
    pub fn kind_of(&self, r: HeapRef) -> EngineResult<ObjectKind> {
        Ok(self.get(r)?.header.kind)
    }

    /// Number of live cells.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Collection statistics.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// The tuning knobs this heap was created with.
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Current collector phase.
    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    /// True while a marking cycle is in progress. Consulted by the write
    /// barrier on every store.
    #[inline]
    pub fn gc_ongoing(&self) -> bool {
        self.phase == GcPhase::Marking
    }

    // ------------------------------------------------------------------
    // Write barrier
    // ------------------------------------------------------------------

    /// Barrier check performed on every field store. The fast path is one
    /// flag test; the slow path runs only while marking is in progress.
    #[inline]
    fn record_write(&mut self, stored: TaggedValue) {
        if self.gc_ongoing() {
            self.barrier_slow(stored);
        }
    }

    /// Eagerly marks a newly-stored referent so a marking pass that already
    /// visited its container cannot lose it. Primitive stores fall through
    /// without effect.
    #[cold]
    fn barrier_slow(&mut self, stored: TaggedValue) {
        if let Some(r) = stored.as_object() {
            self.stats.barrier_marks += 1;
            self.mark_and_push(r);
        }
    }

    /// Sets the mark bit and queues the object for tracing. The bit
    /// deduplicates: a cell already marked this cycle is not pushed again.
    pub(crate) fn mark_and_push(&mut self, r: HeapRef) {
        if let Some(cell) = self.slots.get_mut(r.as_usize()).and_then(Option::as_mut) {
            if !cell.header.marked {
                cell.header.marked = true;
                self.mark_stack.push(r);
                self.stats.objects_marked += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Plain objects
    // ------------------------------------------------------------------

    fn object_data(&self, obj: HeapRef) -> EngineResult<&ObjectData> {
        match &self.get(obj)?.data {
            HeapData::Object(data) => Ok(data),
            other => Err(EngineError::type_error(format!(
                "{} is not a plain object",
                other.kind().as_str()
            ))),
        }
    }

    fn object_data_mut(&mut self, obj: HeapRef) -> EngineResult<&mut ObjectData> {
        match &mut self.get_mut(obj)?.data {
            HeapData::Object(data) => Ok(data),
            other => Err(EngineError::type_error(format!(
                "{} is not a plain object",
                other.kind().as_str()
            ))),
        }
    }

    /// Reads a property, following the prototype chain. Absent properties
    /// read as undefined.
    pub fn object_get_property(&self, obj: HeapRef, name: &str) -> EngineResult<TaggedValue> {
        let mut current = obj;
        loop {
            let data = self.object_data(current)?;
            if let Some(value) = data.get(name) {
                return Ok(value);
            }
            match data.prototype {
                Some(proto) => current = proto,
                None => return Ok(TaggedValue::undefined()),
            }
        }
    }

    /// Reads an own property without consulting the prototype chain.
    pub fn object_own_property(
        &self,
        obj: HeapRef,
        name: &str,
    ) -> EngineResult<Option<TaggedValue>> {
        Ok(self.object_data(obj)?.get(name))
    }

    /// Creates or updates an own property.
    pub fn object_set_property(
        &mut self,
        obj: HeapRef,
        name: &str,
        value: TaggedValue,
    ) -> EngineResult<()> {
        self.record_write(value);
        self.object_data_mut(obj)?.set(name, value);
        Ok(())
    }

    /// Own property names in creation order.
    pub fn object_property_names(&self, obj: HeapRef) -> EngineResult<Vec<String>> {
        Ok(self
            .object_data(obj)?
            .properties
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// The prototype link, if any.
    pub fn object_prototype(&self, obj: HeapRef) -> EngineResult<Option<HeapRef>> {
        Ok(self.object_data(obj)?.prototype)
    }

    /// Sets or clears the prototype link. Rejects chains that would cycle.
    pub fn object_set_prototype(
        &mut self,
        obj: HeapRef,
        proto: Option<HeapRef>,
    ) -> EngineResult<()> {
        if let Some(mut walk) = proto {
            loop {
                if walk == obj {
                    return Err(EngineError::type_error("cyclic prototype chain"));
                }
                match self.object_prototype(walk) {
                    Ok(Some(next)) => walk = next,
                    _ => break,
                }
            }
        }
        if let Some(p) = proto {
            self.record_write(TaggedValue::from_object(p));
        }
        self.object_data_mut(obj)?.prototype = proto;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    fn array_data(&self, arr: HeapRef) -> EngineResult<&Vec<TaggedValue>> {
        match &self.get(arr)?.data {
            HeapData::Array(elements) => Ok(elements),
            other => Err(EngineError::type_error(format!(
                "{} is not an array",
                other.kind().as_str()
            ))),
        }
    }

    fn array_data_mut(&mut self, arr: HeapRef) -> EngineResult<&mut Vec<TaggedValue>> {
        match &mut self.get_mut(arr)?.data {
            HeapData::Array(elements) => Ok(elements),
            other => Err(EngineError::type_error(format!(
                "{} is not an array",
                other.kind().as_str()
            ))),
        }
    }

    /// Element count.
    pub fn array_length(&self, arr: HeapRef) -> EngineResult<u32> {
        Ok(self.array_data(arr)?.len() as u32)
    }

    /// Reads an element; out-of-range reads are undefined.
    pub fn array_get(&self, arr: HeapRef, index: u32) -> EngineResult<TaggedValue> {
        Ok(self
            .array_data(arr)?
            .get(index as usize)
            .copied()
            .unwrap_or_else(TaggedValue::undefined))
    }

    /// Writes an element, growing the array with undefined as needed.
    pub fn array_set(&mut self, arr: HeapRef, index: u32, value: TaggedValue) -> EngineResult<()> {
        if index >= MAX_ARRAY_LENGTH {
            return Err(EngineError::range_error("invalid array length"));
        }
        self.record_write(value);
        let elements = self.array_data_mut(arr)?;
        if index as usize >= elements.len() {
            elements.resize(index as usize + 1, TaggedValue::undefined());
        }
        elements[index as usize] = value;
        Ok(())
    }

    /// Appends an element, returning the new length.
    pub fn array_push(&mut self, arr: HeapRef, value: TaggedValue) -> EngineResult<u32> {
        self.record_write(value);
        let elements = self.array_data_mut(arr)?;
        if elements.len() as u32 >= MAX_ARRAY_LENGTH {
            return Err(EngineError::range_error("invalid array length"));
        }
        elements.push(value);
        Ok(elements.len() as u32)
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    fn string_data(&self, s: HeapRef) -> EngineResult<&Vec<u16>> {
        match &self.get(s)?.data {
            HeapData::String(units) => Ok(units),
            other => Err(EngineError::type_error(format!(
                "{} is not a string",
                other.kind().as_str()
            ))),
        }
    }

    /// Code-unit count.
    pub fn string_length(&self, s: HeapRef) -> EngineResult<u32> {
        Ok(self.string_data(s)?.len() as u32)
    }

    /// The raw UTF-16 code units.
    pub fn string_units(&self, s: HeapRef) -> EngineResult<&[u16]> {
        Ok(self.string_data(s)?.as_slice())
    }

    /// Rust-text view; unpaired surrogates become replacement characters.
    pub fn string_value(&self, s: HeapRef) -> EngineResult<String> {
        Ok(String::from_utf16_lossy(self.string_data(s)?))
    }

    // ------------------------------------------------------------------
    // Maps and sets
    // ------------------------------------------------------------------

    /// SameValueZero over the core value set: numbers compare numerically
    /// with NaN equal to itself and both zeros equal, strings by content,
    /// everything else by identity.
    pub fn same_value_zero(&self, a: TaggedValue, b: TaggedValue) -> bool {
        if let (Some(x), Some(y)) = (a.number_value(), b.number_value()) {
            return x == y || (x.is_nan() && y.is_nan());
        }
        match (a.decode(), b.decode()) {
            (Variant::Object(x), Variant::Object(y)) => {
                let both_strings = self.kind_of(x) == Ok(ObjectKind::String)
                    && self.kind_of(y) == Ok(ObjectKind::String);
                if both_strings {
                    self.string_data(x).ok() == self.string_data(y).ok()
                } else {
                    x == y
                }
            }
            _ => a.to_bits() == b.to_bits(),
        }
    }

    fn map_data(&self, map: HeapRef) -> EngineResult<&Vec<(TaggedValue, TaggedValue)>> {
        match &self.get(map)?.data {
            HeapData::Map(entries) => Ok(entries),
            other => Err(EngineError::type_error(format!(
                "{} is not a map",
                other.kind().as_str()
            ))),
        }
    }

    /// Entry count.
    pub fn map_size(&self, map: HeapRef) -> EngineResult<u32> {
        Ok(self.map_data(map)?.len() as u32)
    }

    /// Looks up a value by key; missing keys read as undefined.
    pub fn map_get(&self, map: HeapRef, key: TaggedValue) -> EngineResult<TaggedValue> {
        let entries = self.map_data(map)?;
        for &(k, v) in entries {
            if self.same_value_zero(k, key) {
                return Ok(v);
            }
        }
        Ok(TaggedValue::undefined())
    }

    /// True when the key is present.
    pub fn map_has(&self, map: HeapRef, key: TaggedValue) -> EngineResult<bool> {
        let entries = self.map_data(map)?;
        Ok(entries.iter().any(|&(k, _)| self.same_value_zero(k, key)))
    }

    /// Inserts or updates an entry, preserving insertion order.
    pub fn map_set(
        &mut self,
        map: HeapRef,
        key: TaggedValue,
        value: TaggedValue,
    ) -> EngineResult<()> {
        self.record_write(key);
        self.record_write(value);
        let position = self
            .map_data(map)?
            .iter()
            .position(|&(k, _)| self.same_value_zero(k, key));
        match &mut self.get_mut(map)?.data {
            HeapData::Map(entries) => {
                match position {
                    Some(i) => entries[i].1 = value,
                    None => entries.push((key, value)),
                }
                Ok(())
            }
            other => Err(EngineError::type_error(format!(
                "{} is not a map",
                other.kind().as_str()
            ))),
        }
    }

    /// The entry at an insertion-order position, if still in range.
    pub fn map_entry_at(
        &self,
        map: HeapRef,
        index: u32,
    ) -> EngineResult<Option<(TaggedValue, TaggedValue)>> {
        Ok(self.map_data(map)?.get(index as usize).copied())
    }

    fn set_data(&self, set: HeapRef) -> EngineResult<&Vec<TaggedValue>> {
        match &self.get(set)?.data {
            HeapData::Set(values) => Ok(values),
            other => Err(EngineError::type_error(format!(
                "{} is not a set",
                other.kind().as_str()
            ))),
        }
    }

    /// Element count.
    pub fn set_size(&self, set: HeapRef) -> EngineResult<u32> {
        Ok(self.set_data(set)?.len() as u32)
    }

    /// True when the value is present.
    pub fn set_has(&self, set: HeapRef, value: TaggedValue) -> EngineResult<bool> {
        let values = self.set_data(set)?;
        Ok(values.iter().any(|&v| self.same_value_zero(v, value)))
    }

    /// Adds a value if absent; returns whether it was inserted.
    pub fn set_add(&mut self, set: HeapRef, value: TaggedValue) -> EngineResult<bool> {
        self.record_write(value);
        if self.set_has(set, value)? {
            return Ok(false);
        }
        match &mut self.get_mut(set)?.data {
            HeapData::Set(values) => {
                values.push(value);
                Ok(true)
            }
            other => Err(EngineError::type_error(format!(
                "{} is not a set",
                other.kind().as_str()
            ))),
        }
    }

    /// The element at an insertion-order position, if still in range.
    pub fn set_value_at(&self, set: HeapRef, index: u32) -> EngineResult<Option<TaggedValue>> {
        Ok(self.set_data(set)?.get(index as usize).copied())
    }

    // ------------------------------------------------------------------
    // Iterator cells
    // ------------------------------------------------------------------

    /// Reads the state of an array/map/set iterator cell.
    pub fn collection_iterator_state(&self, it: HeapRef) -> EngineResult<CollectionIterator> {
        match &self.get(it)?.data {
            HeapData::ArrayIterator(state)
            | HeapData::MapIterator(state)
            | HeapData::SetIterator(state) => Ok(*state),
            other => Err(EngineError::type_error(format!(
                "{} is not a collection iterator",
                other.kind().as_str()
            ))),
        }
    }

    /// Stores updated iterator state (cursor advance or terminal clear).
    pub fn store_collection_iterator_state(
        &mut self,
        it: HeapRef,
        state: CollectionIterator,
    ) -> EngineResult<()> {
        self.record_write(state.target);
        match &mut self.get_mut(it)?.data {
            HeapData::ArrayIterator(slot)
            | HeapData::MapIterator(slot)
            | HeapData::SetIterator(slot) => {
                *slot = state;
                Ok(())
            }
            other => Err(EngineError::type_error(format!(
                "{} is not a collection iterator",
                other.kind().as_str()
            ))),
        }
    }

    /// Reads the state of a string iterator cell.
    pub fn string_iterator_state(&self, it: HeapRef) -> EngineResult<StringIteratorState> {
        match &self.get(it)?.data {
            HeapData::StringIterator(state) => Ok(*state),
            other => Err(EngineError::type_error(format!(
                "{} is not a string iterator",
                other.kind().as_str()
            ))),
        }
    }

    /// Stores updated string-iterator state.
    pub fn store_string_iterator_state(
        &mut self,
        it: HeapRef,
        state: StringIteratorState,
    ) -> EngineResult<()> {
        self.record_write(state.target);
        match &mut self.get_mut(it)?.data {
            HeapData::StringIterator(slot) => {
                *slot = state;
                Ok(())
            }
            other => Err(EngineError::type_error(format!(
                "{} is not a string iterator",
                other.kind().as_str()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Host functions
    // ------------------------------------------------------------------

    /// The registry name of a host function cell.
    pub fn host_function_name(&self, f: HeapRef) -> EngineResult<String> {
        match &self.get(f)?.data {
            HeapData::HostFunction(name) => Ok(name.clone()),
            other => Err(EngineError::type_error(format!(
                "{} is not a function",
                other.kind().as_str()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    /// Registers a long-lived native-side reference as a GC root. The
    /// handle keeps the value alive until dropped.
    pub fn create_persistent(&self, value: TaggedValue) -> PersistentHandle {
        PersistentHandle::new(Rc::clone(&self.roots), value)
    }

    pub(crate) fn persistent_root_values(&self) -> Vec<TaggedValue> {
        self.roots.borrow().values()
    }

    // ------------------------------------------------------------------
    // Display conversion
    // ------------------------------------------------------------------

    /// Script ToString over the core value set.
    pub fn to_display_string(&self, value: TaggedValue) -> String {
        let mut out = String::new();
        let mut visiting = Vec::new();
        self.display_value(value, &mut out, &mut visiting);
        out
    }

    fn display_value(&self, value: TaggedValue, out: &mut String, visiting: &mut Vec<HeapRef>) {
        match value.decode() {
            Variant::Int32(i) => out.push_str(&i.to_string()),
            Variant::Double(d) => out.push_str(&number_to_string(d)),
            Variant::Bool(b) => out.push_str(if b { "true" } else { "false" }),
            Variant::Undefined => out.push_str("undefined"),
            Variant::Null => out.push_str("null"),
            Variant::Object(r) => self.display_object(r, out, visiting),
        }
    }

    fn display_object(&self, r: HeapRef, out: &mut String, visiting: &mut Vec<HeapRef>) {
        if visiting.contains(&r) {
            // Cyclic element; script join renders it empty.
            return;
        }
        let Ok(cell) = self.get(r) else {
            return;
        };
        match &cell.data {
            HeapData::String(units) => out.push_str(&String::from_utf16_lossy(units)),
            HeapData::Array(elements) => {
                visiting.push(r);
                for (i, &element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if !element.is_nullish() {
                        self.display_value(element, out, visiting);
                    }
                }
                visiting.pop();
            }
            HeapData::HostFunction(name) => {
                out.push_str("function ");
                out.push_str(name);
                out.push_str("() { [native code] }");
            }
            HeapData::Map(_) => out.push_str("[object Map]"),
            HeapData::Set(_) => out.push_str("[object Set]"),
            HeapData::ArrayIterator(_) => out.push_str("[object Array Iterator]"),
            HeapData::MapIterator(_) => out.push_str("[object Map Iterator]"),
            HeapData::SetIterator(_) => out.push_str("[object Set Iterator]"),
            HeapData::StringIterator(_) => out.push_str("[object String Iterator]"),
            HeapData::Object(_) => out.push_str("[object Object]"),
        }
    }
}
