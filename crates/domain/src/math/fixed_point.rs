//! Checked integer helpers shared by both engines.
//!
//! Every division truncates toward zero. Products that leave the 256-bit
//! range are reported as [`EngineError::ArithmeticOverflow`].

use crate::error::EngineError;
use primitive_types::{U256, U512};

/// 10_000 basis points == 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// `a * b` or an overflow error tagged with `context`.
pub fn checked_mul(a: U256, b: U256, context: &'static str) -> Result<U256, EngineError> {
    a.checked_mul(b).ok_or(EngineError::ArithmeticOverflow(context))
}

/// `floor(a * b / denominator)` with a checked 256-bit intermediate.
pub fn mul_div(
    a: U256,
    b: U256,
    denominator: U256,
    context: &'static str,
) -> Result<U256, EngineError> {
    if denominator.is_zero() {
        return Err(EngineError::DivisionByZero(context));
    }
    Ok(checked_mul(a, b, context)? / denominator)
}

/// `floor(amount * bps / 10_000)`.
pub fn apply_bps(amount: U256, bps: u32, context: &'static str) -> Result<U256, EngineError> {
    mul_div(
        amount,
        U256::from(bps),
        U256::from(BPS_DENOMINATOR),
        context,
    )
}

/// Floor square root via Newton's method.
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let mut x = n;
    // (n + 1) / 2 without overflowing at U256::MAX
    let mut y = (n >> 1) + (n & U256::one());
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// Narrows a 512-bit value, `None` if the high half is set.
pub fn narrow(value: U512) -> Option<U256> {
    let words = value.0;
    if words[4..].iter().any(|w| *w != 0) {
        return None;
    }
    Some(U256([words[0], words[1], words[2], words[3]]))
}
