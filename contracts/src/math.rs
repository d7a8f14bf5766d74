//! Fixed-point arithmetic for the safety module ledger.
//!
//! Two scales are used:
//! - `WAD` (1e18) for exchange rates, drip factors and slash percentages
//! - `ZOC` (1e4) for annual rates and other percentage weights
//!
//! Every helper comes in a round-down and a round-up flavour. Amounts owed to
//! the protocol (fees, receipt tokens burned) round up, amounts owed to users
//! round down. Nothing here saturates or wraps: overflow, underflow and
//! division by zero are returned as errors.

use odra::casper_types::{U256, U512};
use crate::errors::{SafetyModuleError, SafetyModuleResult};

/// 18-decimal fixed-point scale
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// 4-decimal fixed-point scale (10_000 = 100%)
pub const ZOC: u64 = 10_000;

pub fn wad() -> U256 {
    U256::from(WAD)
}

pub fn zoc() -> U256 {
    U256::from(ZOC)
}

// ========== Checked Integer Ops ==========

pub fn checked_add(a: U256, b: U256) -> SafetyModuleResult<U256> {
    a.checked_add(b).ok_or(SafetyModuleError::ArithmeticOverflow)
}

pub fn checked_sub(a: U256, b: U256) -> SafetyModuleResult<U256> {
    a.checked_sub(b).ok_or(SafetyModuleError::ArithmeticUnderflow)
}

// ========== mulDiv ==========

/// `x * y / denominator`, rounded down, with a 512-bit intermediate product.
pub fn mul_div_down(x: U256, y: U256, denominator: U256) -> SafetyModuleResult<U256> {
    if denominator.is_zero() {
        return Err(SafetyModuleError::DivisionByZero);
    }
    let product = u256_to_u512(x) * u256_to_u512(y);
    u512_to_u256(product / u256_to_u512(denominator))
}

/// `x * y / denominator`, rounded up.
pub fn mul_div_up(x: U256, y: U256, denominator: U256) -> SafetyModuleResult<U256> {
    if denominator.is_zero() {
        return Err(SafetyModuleError::DivisionByZero);
    }
    let product = u256_to_u512(x) * u256_to_u512(y);
    let denominator = u256_to_u512(denominator);
    let mut quotient = product / denominator;
    if !(product % denominator).is_zero() {
        quotient = quotient + U512::one();
    }
    u512_to_u256(quotient)
}

pub fn mul_wad_down(x: U256, y: U256) -> SafetyModuleResult<U256> {
    mul_div_down(x, y, wad())
}

pub fn mul_wad_up(x: U256, y: U256) -> SafetyModuleResult<U256> {
    mul_div_up(x, y, wad())
}

pub fn div_wad_down(x: U256, y: U256) -> SafetyModuleResult<U256> {
    mul_div_down(x, wad(), y)
}

pub fn div_wad_up(x: U256, y: U256) -> SafetyModuleResult<U256> {
    mul_div_up(x, wad(), y)
}

// ========== Width Conversion ==========

fn u256_to_u512(value: U256) -> U512 {
    let mut bytes = [0u8; 32];
    value.to_little_endian(&mut bytes);
    U512::from_little_endian(&bytes)
}

/// Narrow a 512-bit value, failing if any of the upper 256 bits are set.
fn u512_to_u256(value: U512) -> SafetyModuleResult<U256> {
    let mut bytes = [0u8; 64];
    value.to_little_endian(&mut bytes);
    if bytes[32..].iter().any(|b| *b != 0) {
        return Err(SafetyModuleError::ArithmeticOverflow);
    }
    Ok(U256::from_little_endian(&bytes[..32]))
}
