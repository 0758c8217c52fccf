//! Integer math for pools and schedules.

pub mod constant_product;
pub mod fixed_point;

pub use fixed_point::{BPS_DENOMINATOR, apply_bps, checked_mul, isqrt, mul_div};
