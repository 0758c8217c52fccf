//! Side-effect free swap quotes.

use basecore_domain::error::EngineError;
use basecore_domain::fees::FeeSplit;
use basecore_domain::math::constant_product::{
    calculate_out_amount, calculate_price_impact, calculate_spot_price,
};
use basecore_domain::token::TokenAmount;
use basecore_domain::value_objects::Percentage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a swap against given reserves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_in: TokenAmount,
    pub amount_out: TokenAmount,
    /// Fee charged on the input, split between protocol and providers.
    pub fee: FeeSplit,
    pub fee_rate_bps: u32,
    /// `reserve_out / reserve_in` before the trade, `None` past Decimal range.
    pub spot_price_before: Option<Decimal>,
    /// `reserve_out / reserve_in` after the trade, `None` past Decimal range.
    pub spot_price_after: Option<Decimal>,
    /// Relative drop of the marginal price.
    pub price_impact: Percentage,
    /// Input reserve after the trade; the protocol fee is kept outside reserves.
    pub new_reserve_in: TokenAmount,
    pub new_reserve_out: TokenAmount,
}

/// Prices `amount_in` against `(reserve_in, reserve_out)`.
///
/// # Errors
/// `DivisionByZero` on empty reserves, `ArithmeticOverflow` when an
/// intermediate product leaves the 256-bit range.
pub fn quote_swap(
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
    amount_in: TokenAmount,
    fee_rate_bps: u32,
    protocol_fee_share_bps: u32,
) -> Result<SwapQuote, EngineError> {
    let amount_out = calculate_out_amount(amount_in, reserve_in, reserve_out, fee_rate_bps)?;
    let fee = FeeSplit::compute(amount_in, fee_rate_bps, protocol_fee_share_bps)?;

    let new_reserve_in = reserve_in
        .checked_add(amount_in)?
        .checked_sub(fee.protocol)?;
    let new_reserve_out = reserve_out.checked_sub(amount_out)?;

    let price_impact =
        calculate_price_impact(reserve_in, reserve_out, new_reserve_in, new_reserve_out)?;

    Ok(SwapQuote {
        amount_in,
        amount_out,
        fee,
        fee_rate_bps,
        spot_price_before: calculate_spot_price(reserve_in, reserve_out).ok(),
        spot_price_after: calculate_spot_price(new_reserve_in, new_reserve_out).ok(),
        price_impact,
        new_reserve_in,
        new_reserve_out,
    })
}
