use crate::error::EngineError;
use crate::math::fixed_point::apply_bps;
use crate::token::TokenAmount;
use serde::{Deserialize, Serialize};

/// Highest pool fee rate accepted by the engine (10%).
pub const MAX_FEE_RATE_BPS: u32 = 1_000;

/// Highest share of a swap fee that may be diverted to the protocol (50%).
pub const MAX_PROTOCOL_FEE_SHARE_BPS: u32 = 5_000;

/// Fee charged on one swap input, split between protocol and liquidity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSplit {
    /// `floor(amount_in * fee_bps / 10000)`.
    pub total: TokenAmount,
    /// Portion set aside for the fee recipient.
    pub protocol: TokenAmount,
    /// Portion left in reserves.
    pub liquidity_providers: TokenAmount,
}

impl FeeSplit {
    /// Splits the fee charged on `amount_in`.
    pub fn compute(
        amount_in: TokenAmount,
        fee_bps: u32,
        protocol_share_bps: u32,
    ) -> Result<Self, EngineError> {
        let total = TokenAmount(apply_bps(amount_in.0, fee_bps, "swap fee")?);
        let protocol = TokenAmount(apply_bps(total.0, protocol_share_bps, "protocol fee")?);
        let liquidity_providers = total.checked_sub(protocol)?;
        Ok(Self {
            total,
            protocol,
            liquidity_providers,
        })
    }
}

/// Per-pool protocol fee bookkeeping: a cumulative accrual and a claimed watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeAccumulation {
    pub accrued_a: TokenAmount,
    pub accrued_b: TokenAmount,
    pub claimed_a: TokenAmount,
    pub claimed_b: TokenAmount,
}

impl FeeAccumulation {
    /// Fees accrued but not yet paid out.
    pub fn claimable(&self) -> (TokenAmount, TokenAmount) {
        (
            self.accrued_a.saturating_sub(self.claimed_a),
            self.accrued_b.saturating_sub(self.claimed_b),
        )
    }
}
