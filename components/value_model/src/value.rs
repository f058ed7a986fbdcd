//! NaN-boxed tagged value encoding.
//!
//! Every engine value fits in one 64-bit word. Bit patterns below
//! `TAG_THRESHOLD` are IEEE-754 doubles; patterns at or above it carry a
//! 16-bit tag in the high word and a payload in the low 48 bits. Real
//! arithmetic can only ever produce the canonical quiet NaN, so the tag
//! space (a range of impossible NaN payloads) is collision-free as long as
//! every NaN entering the encoding is re-canonicalized first;
//! [`TaggedValue::from_double`] performs that canonicalization.
//!
//! The bit pattern alone determines the variant; no side table is consulted.

use std::fmt;

/// Lowest tagged bit pattern. Everything below this is a double.
const TAG_THRESHOLD: u64 = 0xFFFA_0000_0000_0000;

const TAG_MASK: u64 = 0xFFFF_0000_0000_0000;
const PAYLOAD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

const TAG_INT32: u64 = 0xFFFA_0000_0000_0000;
const TAG_BOOL: u64 = 0xFFFB_0000_0000_0000;
const TAG_UNDEFINED: u64 = 0xFFFC_0000_0000_0000;
const TAG_NULL: u64 = 0xFFFD_0000_0000_0000;
const TAG_OBJECT: u64 = 0xFFFE_0000_0000_0000;

/// The single NaN bit pattern the encoding allows to exist.
const CANONICAL_NAN: u64 = 0x7FF8_0000_0000_0000;

/// Index of a heap cell in the owning heap's object table.
///
/// Heap references are table indexes rather than raw pointers, so the value
/// layer stays free of unsafe code and a stale reference can at worst read a
/// recycled slot, never unmapped memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef(u32);

impl HeapRef {
    /// Wraps a raw object-table index.
    pub fn new(index: u32) -> Self {
        HeapRef(index)
    }

    /// The raw object-table index.
    pub fn index(self) -> u32 {
        self.0
    }

    /// The index widened for slice access.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Discriminant-only view of a tagged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// 32-bit signed integer.
    Int32,
    /// IEEE-754 double.
    Double,
    /// Boolean.
    Bool,
    /// The undefined value.
    Undefined,
    /// The null value.
    Null,
    /// Reference to a heap cell.
    Object,
}

/// Semantic view of a tagged value.
///
/// Correctness tests and slow paths operate on this sum type; the bit-packed
/// [`TaggedValue`] stays behind the [`encode`](TaggedValue::encode) /
/// [`decode`](TaggedValue::decode) boundary.
///
/// Doubles compare by bit pattern: the canonical NaN equals itself and
/// `-0.0` is distinct from `0.0`. This is identity semantics, not the
/// ECMAScript `==` operator.
#[derive(Debug, Clone, Copy)]
pub enum Variant {
    /// 32-bit signed integer.
    Int32(i32),
    /// IEEE-754 double.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// The undefined value.
    Undefined,
    /// The null value.
    Null,
    /// Reference to a heap cell.
    Object(HeapRef),
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::Int32(a), Variant::Int32(b)) => a == b,
            (Variant::Double(a), Variant::Double(b)) => a.to_bits() == b.to_bits(),
            (Variant::Bool(a), Variant::Bool(b)) => a == b,
            (Variant::Undefined, Variant::Undefined) => true,
            (Variant::Null, Variant::Null) => true,
            (Variant::Object(a), Variant::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// One-word NaN-boxed engine value.
///
/// # Examples
///
/// ```
/// use value_model::{HeapRef, Kind, TaggedValue, Variant};
///
/// let n = TaggedValue::from_int32(7);
/// assert_eq!(n.kind(), Kind::Int32);
/// assert_eq!(n.as_int32(), Some(7));
///
/// let obj = TaggedValue::from_object(HeapRef::new(3));
/// assert_eq!(obj.decode(), Variant::Object(HeapRef::new(3)));
/// assert!(obj.as_double().is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaggedValue(u64);

impl TaggedValue {
    /// Encodes a semantic variant into its bit pattern.
    pub fn encode(variant: Variant) -> Self {
        match variant {
            Variant::Int32(i) => Self::from_int32(i),
            Variant::Double(d) => Self::from_double(d),
            Variant::Bool(b) => Self::from_bool(b),
            Variant::Undefined => Self::undefined(),
            Variant::Null => Self::null(),
            Variant::Object(r) => Self::from_object(r),
        }
    }

    /// Decodes the bit pattern back into its semantic variant.
    pub fn decode(self) -> Variant {
        if self.0 < TAG_THRESHOLD {
            return Variant::Double(f64::from_bits(self.0));
        }
        match self.0 & TAG_MASK {
            TAG_INT32 => Variant::Int32(self.payload() as u32 as i32),
            TAG_BOOL => Variant::Bool(self.payload() != 0),
            TAG_UNDEFINED => Variant::Undefined,
            TAG_NULL => Variant::Null,
            TAG_OBJECT => Variant::Object(HeapRef::new(self.payload() as u32)),
            // The constructors only produce the five tags above.
            _ => Variant::Undefined,
        }
    }

    /// Encodes a 32-bit integer.
    pub fn from_int32(i: i32) -> Self {
        TaggedValue(TAG_INT32 | u64::from(i as u32))
    }

    /// Encodes a double, re-canonicalizing every NaN.
    ///
    /// Canonicalization is what keeps the tag space sound: a NaN payload
    /// overlapping `TAG_THRESHOLD` would otherwise decode as a tagged
    /// variant.
    pub fn from_double(d: f64) -> Self {
        if d.is_nan() {
            TaggedValue(CANONICAL_NAN)
        } else {
            TaggedValue(d.to_bits())
        }
    }

    /// Encodes a boolean.
    pub fn from_bool(b: bool) -> Self {
        TaggedValue(TAG_BOOL | u64::from(b))
    }

    /// The undefined value.
    pub fn undefined() -> Self {
        TaggedValue(TAG_UNDEFINED)
    }

    /// The null value.
    pub fn null() -> Self {
        TaggedValue(TAG_NULL)
    }

    /// Encodes a heap reference.
    pub fn from_object(r: HeapRef) -> Self {
        TaggedValue(TAG_OBJECT | u64::from(r.index()))
    }

    /// The variant discriminant.
    pub fn kind(self) -> Kind {
        if self.0 < TAG_THRESHOLD {
            return Kind::Double;
        }
        match self.0 & TAG_MASK {
            TAG_INT32 => Kind::Int32,
            TAG_BOOL => Kind::Bool,
            TAG_UNDEFINED => Kind::Undefined,
            TAG_NULL => Kind::Null,
            _ => Kind::Object,
        }
    }

    /// True for int32 values.
    pub fn is_int32(self) -> bool {
        self.0 & TAG_MASK == TAG_INT32
    }

    /// True for double values.
    pub fn is_double(self) -> bool {
        self.0 < TAG_THRESHOLD
    }

    /// True for int32 or double values.
    pub fn is_number(self) -> bool {
        self.is_double() || self.is_int32()
    }

    /// True for booleans.
    pub fn is_bool(self) -> bool {
        self.0 & TAG_MASK == TAG_BOOL
    }

    /// True for the undefined value.
    pub fn is_undefined(self) -> bool {
        self.0 == TAG_UNDEFINED
    }

    /// True for the null value.
    pub fn is_null(self) -> bool {
        self.0 == TAG_NULL
    }

    /// True for undefined or null.
    pub fn is_nullish(self) -> bool {
        self.is_undefined() || self.is_null()
    }

    /// True for heap references.
    pub fn is_object(self) -> bool {
        self.0 & TAG_MASK == TAG_OBJECT
    }

    /// The integer payload, if this is an int32.
    pub fn as_int32(self) -> Option<i32> {
        if self.is_int32() {
            Some(self.payload() as u32 as i32)
        } else {
            None
        }
    }

    /// The double payload, if this is a double.
    pub fn as_double(self) -> Option<f64> {
        if self.is_double() {
            Some(f64::from_bits(self.0))
        } else {
            None
        }
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(self) -> Option<bool> {
        if self.is_bool() {
            Some(self.payload() != 0)
        } else {
            None
        }
    }

    /// The heap reference, if this is an object.
    pub fn as_object(self) -> Option<HeapRef> {
        if self.is_object() {
            Some(HeapRef::new(self.payload() as u32))
        } else {
            None
        }
    }

    /// Numeric value of an int32 or double, widened to f64.
    pub fn number_value(self) -> Option<f64> {
        match self.decode() {
            Variant::Int32(i) => Some(f64::from(i)),
            Variant::Double(d) => Some(d),
            _ => None,
        }
    }

    /// ToNumber for the non-heap variants.
    ///
    /// Returns `None` for heap references; converting those needs the heap
    /// and is handled by the interpreter.
    pub fn coerce_to_number(self) -> Option<f64> {
        match self.decode() {
            Variant::Int32(i) => Some(f64::from(i)),
            Variant::Double(d) => Some(d),
            Variant::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            Variant::Undefined => Some(f64::NAN),
            Variant::Null => Some(0.0),
            Variant::Object(_) => None,
        }
    }

    /// ToBoolean for the non-heap variants.
    ///
    /// Returns `None` for heap references; string emptiness is resolved by
    /// the interpreter, every other heap object is truthy.
    pub fn coerce_to_bool(self) -> Option<bool> {
        match self.decode() {
            Variant::Int32(i) => Some(i != 0),
            Variant::Double(d) => Some(d != 0.0 && !d.is_nan()),
            Variant::Bool(b) => Some(b),
            Variant::Undefined | Variant::Null => Some(false),
            Variant::Object(_) => None,
        }
    }

    /// The raw 64-bit pattern. Exposed for sign and canonicalization tests.
    pub fn to_bits(self) -> u64 {
        self.0
    }

    fn payload(self) -> u64 {
        self.0 & PAYLOAD_MASK
    }
}

impl fmt::Debug for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Variant::Int32(i) => write!(f, "Int32({i})"),
            Variant::Double(d) => write!(f, "Double({d})"),
            Variant::Bool(b) => write!(f, "Bool({b})"),
            Variant::Undefined => write!(f, "Undefined"),
            Variant::Null => write!(f, "Null"),
            Variant::Object(r) => write!(f, "Object({})", r.index()),
        }
    }
}

impl Default for TaggedValue {
    fn default() -> Self {
        TaggedValue::undefined()
    }
}
