//! Overflow-checked int32 arithmetic with ECMAScript promotion.
//!
//! These helpers back the interpreter's integer fast paths. They never fail:
//! a result that does not fit an int32 (or that must carry a signed zero) is
//! silently promoted to a double, exactly as script semantics require.

use crate::value::TaggedValue;

/// `a + b`, promoted to a double on overflow.
pub fn add_int32(a: i32, b: i32) -> TaggedValue {
    match a.checked_add(b) {
        Some(sum) => TaggedValue::from_int32(sum),
        None => TaggedValue::from_double(f64::from(a) + f64::from(b)),
    }
}

/// `a - b`, promoted to a double on overflow.
pub fn sub_int32(a: i32, b: i32) -> TaggedValue {
    match a.checked_sub(b) {
        Some(diff) => TaggedValue::from_int32(diff),
        None => TaggedValue::from_double(f64::from(a) - f64::from(b)),
    }
}

/// `a * b`, promoted to a double on overflow.
///
/// A zero product with exactly one negative operand is `-0.0`. Naive integer
/// multiplication would lose the sign of that zero.
pub fn mul_int32(a: i32, b: i32) -> TaggedValue {
    match a.checked_mul(b) {
        Some(0) if (a < 0) != (b < 0) => TaggedValue::from_double(-0.0),
        Some(product) => TaggedValue::from_int32(product),
        None => TaggedValue::from_double(f64::from(a) * f64::from(b)),
    }
}

/// `-a`. Negating `0` yields `-0.0`; negating `i32::MIN` yields `2147483648.0`.
pub fn neg_int32(a: i32) -> TaggedValue {
    if a == 0 {
        return TaggedValue::from_double(-0.0);
    }
    match a.checked_neg() {
        Some(n) => TaggedValue::from_int32(n),
        None => TaggedValue::from_double(-f64::from(a)),
    }
}

/// `a / b`. Integer result only when the quotient is exact, representable,
/// and not `-0`; everything else takes the double path (which produces
/// Infinity or NaN for zero divisors).
pub fn div_int32(a: i32, b: i32) -> TaggedValue {
    if b != 0 {
        if let (Some(q), Some(r)) = (a.checked_div(b), a.checked_rem(b)) {
            if r == 0 && !(a == 0 && b < 0) {
                return TaggedValue::from_int32(q);
            }
        }
    }
    TaggedValue::from_double(f64::from(a) / f64::from(b))
}

/// `a % b`. The integer fast path is taken only when the remainder is
/// nonzero or the dividend is non-negative; a zero remainder from a negative
/// dividend is `-0.0` and must go through the double path.
pub fn mod_int32(a: i32, b: i32) -> TaggedValue {
    if b != 0 {
        if let Some(r) = a.checked_rem(b) {
            if r != 0 || a >= 0 {
                return TaggedValue::from_int32(r);
            }
        }
    }
    TaggedValue::from_double(f64::from(a) % f64::from(b))
}
