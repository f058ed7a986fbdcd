//! Instruction dispatch loop
//!
//! One decode-and-execute pass over a code unit. The loop keeps the
//! accumulator in a local; every other live value sits in the frame's
//! registers or the globals, which is exactly the root set handed to the
//! collector at the polling points.
//!
//! Handlers that can allocate poll the collector first, then do all of
//! their reads and allocations without another poll. The heap only sweeps
//! inside a poll, so values a handler holds in locals stay valid for the
//! whole instruction, and anything allocated while a cycle is marking is
//! born gray.

use std::cmp::Ordering;

use bytecode_stream::{CodeCursor, CodeUnit, Constant, Instruction};
use heap_manager::{IterationKind, ObjectKind};
use iterator_objects::{
    create_iter_result_object, iterator_next, new_array_iterator, new_map_iterator,
    new_set_iterator, new_string_iterator,
};
use value_model::{
    add_int32, div_int32, mod_int32, mul_int32, neg_int32, sub_int32, EngineError, EngineResult,
    TaggedValue,
};

use crate::vm::Vm;

/// What the loop does after one instruction.
enum Flow {
    Next,
    Return(TaggedValue),
}

impl Vm {
    /// Runs one code unit against the innermost frame.
    pub(crate) fn run(&mut self, unit: &CodeUnit) -> EngineResult<TaggedValue> {
        let mut cursor = CodeCursor::new(&unit.code);
        let mut acc = TaggedValue::undefined();
        loop {
            let Some(instruction) = cursor.step()? else {
                // Falling off the end yields the accumulator, so expression
                // snippets evaluate without a trailing Return.
                return Ok(acc);
            };
            let at = cursor.tracker().current_instruction_offset();
            match self.step_instruction(unit, &mut cursor, instruction, &mut acc) {
                Ok(Flow::Next) => {}
                Ok(Flow::Return(value)) => return Ok(value),
                Err(error) => return Err(error.at_offset(at)),
            }
        }
    }

    fn step_instruction(
        &mut self,
        unit: &CodeUnit,
        cursor: &mut CodeCursor<'_>,
        instruction: Instruction,
        acc: &mut TaggedValue,
    ) -> EngineResult<Flow> {
        match instruction {
            Instruction::LoadConst { index } => {
                self.poll_gc(*acc);
                *acc = self.constant_value(unit, index)?;
            }
            Instruction::LoadInt { value } => {
                *acc = TaggedValue::from_int32(value);
            }
            Instruction::LoadUndefined => {
                *acc = TaggedValue::undefined();
            }
            Instruction::LoadNull => {
                *acc = TaggedValue::null();
            }
            Instruction::LoadTrue => {
                *acc = TaggedValue::from_bool(true);
            }
            Instruction::LoadFalse => {
                *acc = TaggedValue::from_bool(false);
            }
            Instruction::LoadReg { reg } => {
                *acc = self.register(reg as usize);
            }
            Instruction::StoreReg { reg } => {
                self.set_register(reg as usize, *acc);
            }
            Instruction::LoadGlobal { name } => {
                let key = unit.name(name)?;
                *acc = match self.globals.get(key) {
                    Some(&value) => value,
                    None => {
                        return Err(EngineError::reference_error(format!(
                            "{key} is not defined"
                        )))
                    }
                };
            }
            Instruction::StoreGlobal { name } => {
                // Globals are part of the root set and get rescanned when a
                // cycle finishes, so the store needs no barrier.
                let key = unit.name(name)?;
                self.globals.insert(key.to_string(), *acc);
            }
            Instruction::Add { lhs } => {
                let a = self.register(lhs as usize);
                self.poll_gc(*acc);
                *acc = self.add(a, *acc)?;
            }
            Instruction::Sub { lhs } => {
                let a = self.register(lhs as usize);
                *acc = self.sub(a, *acc)?;
            }
            Instruction::Mul { lhs } => {
                let a = self.register(lhs as usize);
                *acc = self.mul(a, *acc)?;
            }
            Instruction::Div { lhs } => {
                let a = self.register(lhs as usize);
                *acc = self.div(a, *acc)?;
            }
            Instruction::Mod { lhs } => {
                let a = self.register(lhs as usize);
                *acc = self.modulo(a, *acc)?;
            }
            Instruction::Neg => {
                *acc = match acc.as_int32() {
                    Some(i) => neg_int32(i),
                    None => TaggedValue::from_double(-self.to_number(*acc)?),
                };
            }
            Instruction::Not => {
                *acc = TaggedValue::from_bool(!self.to_boolean(*acc)?);
            }
            Instruction::Equal { lhs } => {
                let a = self.register(lhs as usize);
                *acc = TaggedValue::from_bool(self.loosely_equal(a, *acc)?);
            }
            Instruction::NotEqual { lhs } => {
                let a = self.register(lhs as usize);
                *acc = TaggedValue::from_bool(!self.loosely_equal(a, *acc)?);
            }
            Instruction::StrictEqual { lhs } => {
                let a = self.register(lhs as usize);
                *acc = TaggedValue::from_bool(self.strictly_equal(a, *acc));
            }
            Instruction::StrictNotEqual { lhs } => {
                let a = self.register(lhs as usize);
                *acc = TaggedValue::from_bool(!self.strictly_equal(a, *acc));
            }
            Instruction::LessThan { lhs } => {
                let a = self.register(lhs as usize);
                let ordering = self.compare_values(a, *acc)?;
                *acc = TaggedValue::from_bool(ordering == Some(Ordering::Less));
            }
            Instruction::LessEqual { lhs } => {
                let a = self.register(lhs as usize);
                let ordering = self.compare_values(a, *acc)?;
                *acc = TaggedValue::from_bool(matches!(
                    ordering,
                    Some(Ordering::Less | Ordering::Equal)
                ));
            }
            Instruction::GreaterThan { lhs } => {
                let a = self.register(lhs as usize);
                let ordering = self.compare_values(a, *acc)?;
                *acc = TaggedValue::from_bool(ordering == Some(Ordering::Greater));
            }
            Instruction::GreaterEqual { lhs } => {
                let a = self.register(lhs as usize);
                let ordering = self.compare_values(a, *acc)?;
                *acc = TaggedValue::from_bool(matches!(
                    ordering,
                    Some(Ordering::Greater | Ordering::Equal)
                ));
            }
            Instruction::Jump { offset } => {
                cursor.jump_relative(offset)?;
            }
            Instruction::JumpIfTrue { offset } => {
                if self.to_boolean(*acc)? {
                    cursor.jump_relative(offset)?;
                }
            }
            Instruction::JumpIfFalse { offset } => {
                if !self.to_boolean(*acc)? {
                    cursor.jump_relative(offset)?;
                }
            }
            Instruction::GetProperty { name } => {
                let key = unit.name(name)?;
                *acc = self.get_property(*acc, key)?;
            }
            Instruction::SetProperty { obj, name } => {
                let target = self.register(obj as usize);
                let key = unit.name(name)?;
                self.set_property(target, key, *acc)?;
            }
            Instruction::GetElement { base } => {
                let target = self.register(base as usize);
                self.poll_gc(*acc);
                *acc = self.get_element(target, *acc)?;
            }
            Instruction::SetElement { base, index } => {
                let target = self.register(base as usize);
                let key = self.register(index as usize);
                self.set_element(target, key, *acc)?;
            }
            Instruction::CreateArray { first, count } => {
                self.poll_gc(*acc);
                let base = first as usize;
                let elements: Vec<TaggedValue> =
                    (0..count as usize).map(|i| self.register(base + i)).collect();
                let array = self.heap.alloc_array(elements)?;
                *acc = TaggedValue::from_object(array);
            }
            Instruction::Call {
                callee,
                first_arg,
                argc,
            } => {
                self.poll_gc(*acc);
                let target = self.register(callee as usize);
                *acc = self.call_value(target, first_arg as usize, argc as usize)?;
            }
            Instruction::GetIterator => {
                self.poll_gc(*acc);
                *acc = self.get_iterator(*acc)?;
            }
            Instruction::IteratorNext => {
                self.poll_gc(*acc);
                *acc = self.iterator_step(*acc)?;
            }
            Instruction::Throw => {
                return Err(EngineError::thrown(self.heap.to_display_string(*acc)));
            }
            Instruction::Return => {
                return Ok(Flow::Return(*acc));
            }
        }
        Ok(Flow::Next)
    }

    fn constant_value(&mut self, unit: &CodeUnit, index: u16) -> EngineResult<TaggedValue> {
        match unit.constant(index)? {
            Constant::Number(n) => Ok(TaggedValue::from_double(*n)),
            Constant::String(text) => {
                let s = self.heap.alloc_string_from_str(text)?;
                Ok(TaggedValue::from_object(s))
            }
            Constant::Bool(b) => Ok(TaggedValue::from_bool(*b)),
            Constant::Null => Ok(TaggedValue::null()),
            Constant::Undefined => Ok(TaggedValue::undefined()),
        }
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    fn add(&mut self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        // String concatenation has priority
        if self.is_string(a)? || self.is_string(b)? {
            return self.concat(a, b);
        }
        if let (Some(x), Some(y)) = (a.as_int32(), b.as_int32()) {
            return Ok(add_int32(x, y));
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(TaggedValue::from_double(x + y))
    }

    fn sub(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        if let (Some(x), Some(y)) = (a.as_int32(), b.as_int32()) {
            return Ok(sub_int32(x, y));
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(TaggedValue::from_double(x - y))
    }

    fn mul(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        if let (Some(x), Some(y)) = (a.as_int32(), b.as_int32()) {
            return Ok(mul_int32(x, y));
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(TaggedValue::from_double(x * y))
    }

    fn div(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        if let (Some(x), Some(y)) = (a.as_int32(), b.as_int32()) {
            return Ok(div_int32(x, y));
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(TaggedValue::from_double(x / y))
    }

    fn modulo(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        if let (Some(x), Some(y)) = (a.as_int32(), b.as_int32()) {
            return Ok(mod_int32(x, y));
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        // f64 remainder has script semantics: sign of the dividend.
        Ok(TaggedValue::from_double(x % y))
    }

    fn concat(&mut self, a: TaggedValue, b: TaggedValue) -> EngineResult<TaggedValue> {
        let mut units = self.value_units(a)?;
        units.extend(self.value_units(b)?);
        let s = self.heap.alloc_string(units)?;
        Ok(TaggedValue::from_object(s))
    }

    /// UTF-16 units of the value's string form. Heap strings pass their
    /// units through untouched, so lone surrogates survive concatenation.
    fn value_units(&self, value: TaggedValue) -> EngineResult<Vec<u16>> {
        if let Some(r) = value.as_object() {
            if self.heap.kind_of(r)? == ObjectKind::String {
                return Ok(self.heap.string_units(r)?.to_vec());
            }
        }
        Ok(self.heap.to_display_string(value).encode_utf16().collect())
    }

    fn is_string(&self, value: TaggedValue) -> EngineResult<bool> {
        match value.as_object() {
            Some(r) => Ok(self.heap.kind_of(r)? == ObjectKind::String),
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Coercion
    // ------------------------------------------------------------------

    fn to_number(&self, value: TaggedValue) -> EngineResult<f64> {
        if let Some(n) = value.coerce_to_number() {
            return Ok(n);
        }
        // Heap value: strings convert by content, everything else is NaN.
        if let Some(r) = value.as_object() {
            if self.heap.kind_of(r)? == ObjectKind::String {
                let text = self.heap.string_value(r)?;
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                return Ok(trimmed.parse::<f64>().unwrap_or(f64::NAN));
            }
        }
        Ok(f64::NAN)
    }

    fn to_boolean(&self, value: TaggedValue) -> EngineResult<bool> {
        if let Some(b) = value.coerce_to_bool() {
            return Ok(b);
        }
        // Heap value: only the empty string is falsy.
        if let Some(r) = value.as_object() {
            if self.heap.kind_of(r)? == ObjectKind::String {
                return Ok(self.heap.string_length(r)? > 0);
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    fn loosely_equal(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<bool> {
        // undefined and null equal each other and themselves, nothing else.
        if a.is_nullish() || b.is_nullish() {
            return Ok(a.is_nullish() && b.is_nullish());
        }
        // Booleans compare as numbers.
        if let Some(x) = a.as_bool() {
            return self.loosely_equal(TaggedValue::from_int32(x as i32), b);
        }
        if let Some(y) = b.as_bool() {
            return self.loosely_equal(a, TaggedValue::from_int32(y as i32));
        }
        match (a.as_object(), b.as_object()) {
            // Both numeric; f64 equality gives NaN != NaN and 0 == -0.
            (None, None) => Ok(a.number_value() == b.number_value()),
            (Some(x), Some(y)) => {
                let both_strings = self.heap.kind_of(x)? == ObjectKind::String
                    && self.heap.kind_of(y)? == ObjectKind::String;
                if both_strings {
                    Ok(self.heap.string_units(x)? == self.heap.string_units(y)?)
                } else {
                    Ok(x == y)
                }
            }
            // Number against a heap value: strings convert by content, other
            // objects become NaN and compare unequal.
            _ => {
                let x = self.to_number(a)?;
                let y = self.to_number(b)?;
                Ok(x == y)
            }
        }
    }

    fn strictly_equal(&self, a: TaggedValue, b: TaggedValue) -> bool {
        if a.is_number() || b.is_number() {
            // Option equality: a number never strictly equals a non-number,
            // NaN never equals itself, and the zeros coincide.
            return a.number_value() == b.number_value();
        }
        self.heap.same_value_zero(a, b)
    }

    /// Ordering for the relational operators. `None` means an operand
    /// converted to NaN, which makes all four comparisons false.
    fn compare_values(&self, a: TaggedValue, b: TaggedValue) -> EngineResult<Option<Ordering>> {
        if let (Some(x), Some(y)) = (a.as_object(), b.as_object()) {
            let both_strings = self.heap.kind_of(x)? == ObjectKind::String
                && self.heap.kind_of(y)? == ObjectKind::String;
            if both_strings {
                // Lexicographic by UTF-16 code unit.
                return Ok(Some(self.heap.string_units(x)?.cmp(self.heap.string_units(y)?)));
            }
        }
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(x.partial_cmp(&y))
    }

    // ------------------------------------------------------------------
    // Properties and elements
    // ------------------------------------------------------------------

    fn get_property(&self, value: TaggedValue, key: &str) -> EngineResult<TaggedValue> {
        if value.is_nullish() {
            return Err(EngineError::type_error(format!(
                "cannot read property '{key}' of {}",
                self.heap.to_display_string(value)
            )));
        }
        let Some(r) = value.as_object() else {
            // Number and boolean primitives carry no properties here.
            return Ok(TaggedValue::undefined());
        };
        match self.heap.kind_of(r)? {
            ObjectKind::Object => self.heap.object_get_property(r, key),
            ObjectKind::Array => match key {
                "length" => Ok(length_value(self.heap.array_length(r)?)),
                _ => Ok(TaggedValue::undefined()),
            },
            ObjectKind::String => match key {
                "length" => Ok(length_value(self.heap.string_length(r)?)),
                _ => Ok(TaggedValue::undefined()),
            },
            ObjectKind::Map => match key {
                "size" => Ok(length_value(self.heap.map_size(r)?)),
                _ => Ok(TaggedValue::undefined()),
            },
            ObjectKind::Set => match key {
                "size" => Ok(length_value(self.heap.set_size(r)?)),
                _ => Ok(TaggedValue::undefined()),
            },
            _ => Ok(TaggedValue::undefined()),
        }
    }

    fn set_property(
        &mut self,
        target: TaggedValue,
        key: &str,
        value: TaggedValue,
    ) -> EngineResult<()> {
        let receiver = match target.as_object() {
            Some(r) if self.heap.kind_of(r)? == ObjectKind::Object => r,
            _ => {
                return Err(EngineError::type_error(format!(
                    "cannot set property '{key}' on {}",
                    self.describe(target)
                )))
            }
        };
        self.heap.object_set_property(receiver, key, value)
    }

    fn get_element(&mut self, target: TaggedValue, index: TaggedValue) -> EngineResult<TaggedValue> {
        if target.is_nullish() {
            return Err(EngineError::type_error(format!(
                "cannot index {} with {}",
                self.heap.to_display_string(target),
                self.heap.to_display_string(index)
            )));
        }
        let Some(r) = target.as_object() else {
            return Ok(TaggedValue::undefined());
        };
        match self.heap.kind_of(r)? {
            ObjectKind::Array => {
                if let Some(i) = element_index(index) {
                    return self.heap.array_get(r, i);
                }
                match self.heap.to_display_string(index).as_str() {
                    "length" => Ok(length_value(self.heap.array_length(r)?)),
                    _ => Ok(TaggedValue::undefined()),
                }
            }
            ObjectKind::String => {
                if let Some(i) = element_index(index) {
                    if i < self.heap.string_length(r)? {
                        let unit = self.heap.string_units(r)?[i as usize];
                        let s = self.heap.alloc_string(vec![unit])?;
                        return Ok(TaggedValue::from_object(s));
                    }
                    return Ok(TaggedValue::undefined());
                }
                match self.heap.to_display_string(index).as_str() {
                    "length" => Ok(length_value(self.heap.string_length(r)?)),
                    _ => Ok(TaggedValue::undefined()),
                }
            }
            ObjectKind::Object => {
                let key = self.heap.to_display_string(index);
                self.heap.object_get_property(r, &key)
            }
            _ => Ok(TaggedValue::undefined()),
        }
    }

    fn set_element(
        &mut self,
        target: TaggedValue,
        index: TaggedValue,
        value: TaggedValue,
    ) -> EngineResult<()> {
        let Some(r) = target.as_object() else {
            return Err(EngineError::type_error(format!(
                "cannot index {} with {}",
                self.heap.to_display_string(target),
                self.heap.to_display_string(index)
            )));
        };
        match self.heap.kind_of(r)? {
            ObjectKind::Array => match element_index(index) {
                Some(i) => self.heap.array_set(r, i, value),
                None => Err(EngineError::range_error(format!(
                    "invalid array index {}",
                    self.heap.to_display_string(index)
                ))),
            },
            ObjectKind::Object => {
                let key = self.heap.to_display_string(index);
                self.heap.object_set_property(r, &key, value)
            }
            kind => Err(EngineError::type_error(format!(
                "cannot write elements of {}",
                kind.as_str()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Calls and iteration
    // ------------------------------------------------------------------

    fn call_value(
        &mut self,
        callee: TaggedValue,
        first_arg: usize,
        argc: usize,
    ) -> EngineResult<TaggedValue> {
        let target = match callee.as_object() {
            Some(r) if self.heap.kind_of(r)? == ObjectKind::HostFunction => r,
            _ => {
                return Err(EngineError::type_error(format!(
                    "{} is not a function",
                    self.describe(callee)
                )))
            }
        };
        let name = self.heap.host_function_name(target)?;
        let Some(function) = self.host_functions.get(&name).copied() else {
            return Err(EngineError::type_error(format!(
                "host function {name} is not registered"
            )));
        };
        // The argument window stays live in the caller's registers, so the
        // copies here need no extra rooting.
        let args: Vec<TaggedValue> = (0..argc).map(|i| self.register(first_arg + i)).collect();
        function(self, TaggedValue::undefined(), &args)
    }

    fn get_iterator(&mut self, value: TaggedValue) -> EngineResult<TaggedValue> {
        let Some(r) = value.as_object() else {
            return Err(EngineError::type_error(format!(
                "{} is not iterable",
                self.heap.to_display_string(value)
            )));
        };
        let iter = match self.heap.kind_of(r)? {
            ObjectKind::Array => new_array_iterator(&mut self.heap, r, IterationKind::Values)?,
            ObjectKind::Map => new_map_iterator(&mut self.heap, r, IterationKind::Entries)?,
            ObjectKind::Set => new_set_iterator(&mut self.heap, r, IterationKind::Values)?,
            ObjectKind::String => new_string_iterator(&mut self.heap, r)?,
            // An iterator is its own iterator.
            ObjectKind::ArrayIterator
            | ObjectKind::MapIterator
            | ObjectKind::SetIterator
            | ObjectKind::StringIterator => r,
            kind => {
                return Err(EngineError::type_error(format!(
                    "{} is not iterable",
                    kind.as_str()
                )))
            }
        };
        Ok(TaggedValue::from_object(iter))
    }

    fn iterator_step(&mut self, value: TaggedValue) -> EngineResult<TaggedValue> {
        let Some(iter) = value.as_object() else {
            return Err(EngineError::type_error(format!(
                "{} is not an iterator",
                self.heap.to_display_string(value)
            )));
        };
        let (step_value, done) = iterator_next(&mut self.heap, iter)?;
        let result = create_iter_result_object(&mut self.heap, step_value, done)?;
        Ok(TaggedValue::from_object(result))
    }

    /// Short form of a value for diagnostics: kind name for heap objects,
    /// display string for primitives.
    fn describe(&self, value: TaggedValue) -> String {
        match value.as_object() {
            Some(r) => match self.heap.kind_of(r) {
                Ok(kind) => kind.as_str().to_string(),
                Err(_) => "object".to_string(),
            },
            None => self.heap.to_display_string(value),
        }
    }
}

/// Array index of a numeric value, when it is a non-negative integer that
/// fits u32. Negative, fractional, and non-numeric values are not indexes.
fn element_index(index: TaggedValue) -> Option<u32> {
    if let Some(i) = index.as_int32() {
        return u32::try_from(i).ok();
    }
    let d = index.as_double()?;
    if d.fract() == 0.0 && d >= 0.0 && d <= f64::from(u32::MAX) {
        Some(d as u32)
    } else {
        None
    }
}

/// Length or size as a script number.
fn length_value(n: u32) -> TaggedValue {
    match i32::try_from(n) {
        Ok(i) => TaggedValue::from_int32(i),
        Err(_) => TaggedValue::from_double(f64::from(n)),
    }
}
