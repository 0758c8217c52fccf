use primitive_types::{U256, U512};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale used when building a percentage from an integer ratio.
const RATIO_SCALE: u32 = 18;

/// A fraction where `1` means 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Percentage(pub Decimal);

impl Percentage {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE_HUNDRED: Self = Self(Decimal::ONE);

    pub fn from_bps(bps: u32) -> Self {
        Self(Decimal::from(bps) / Decimal::from(10000))
    }

    pub fn to_bps(&self) -> u32 {
        (self.0 * Decimal::from(10000)).to_u32().unwrap_or(0)
    }

    /// Exact `numerator / denominator` truncated to 18 decimal places.
    ///
    /// Returns `None` when the denominator is zero or the ratio exceeds one.
    /// The scaled product is taken in 512 bits, so any U256 operands work.
    pub fn from_ratio(numerator: U256, denominator: U256) -> Option<Self> {
        if denominator.is_zero() || numerator > denominator {
            return None;
        }
        let scaled =
            numerator.full_mul(U256::exp10(RATIO_SCALE as usize)) / U512::from(denominator);
        let mantissa = i128::try_from(scaled.low_u128()).ok()?;
        Some(Self(
            Decimal::from_i128_with_scale(mantissa, RATIO_SCALE).normalize(),
        ))
    }

    /// Value expressed in percent (0.25 -> 25).
    pub fn as_percent(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percent().round_dp(4).normalize())
    }
}
