//! # Word Arithmetic
//!
//! Two's complement and 512-bit helpers behind the arithmetic, comparison
//! and bitwise opcodes. All operations wrap modulo 2^256.

use crate::domain::value_objects::U256;
use primitive_types::U512;

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// Signed less than comparison.
#[must_use]
pub fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// SDIV: zero divisor yields zero, `MIN / -1` yields `MIN`.
#[must_use]
pub fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let result = abs(a) / abs(b);
    if is_negative(a) == is_negative(b) {
        result
    } else {
        negate(result)
    }
}

/// SMOD: the result takes the sign of the dividend.
#[must_use]
pub fn signed_mod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let result = abs(a) % abs(b);
    if is_negative(a) {
        negate(result)
    } else {
        result
    }
}

/// ADDMOD computed without intermediate overflow.
#[must_use]
pub fn add_mod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let sum = U512::from(a) + U512::from(b);
    u512_to_u256(sum % U512::from(n))
}

/// MULMOD computed without intermediate overflow.
#[must_use]
pub fn mul_mod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let product = a.full_mul(b);
    u512_to_u256(product % U512::from(n))
}

/// Exponentiation by squaring.
#[must_use]
pub fn exp(base: U256, mut exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;

    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exponent >>= 1;
        base = base.overflowing_mul(base).0;
    }

    result
}

/// SIGNEXTEND: extend the sign bit of byte `byte_index` (0 = lowest).
#[must_use]
pub fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index >= U256::from(31) {
        return value;
    }
    let bit = byte_index.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// BYTE: the `index`-th byte counting from the most significant end.
#[must_use]
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32) {
        return U256::zero();
    }
    U256::from(value.byte(31 - index.low_u64() as usize))
}

/// SHL: zero once the shift reaches 256.
#[must_use]
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// SHR: zero once the shift reaches 256.
#[must_use]
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic shift right.
#[must_use]
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    let shifted = value >> shift;
    if negative && shift > 0 {
        // Fill with 1s
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

/// Convert U512 back to U256, keeping the low half.
fn u512_to_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

// =============================================================================
// TESTS
// =============================================================================
