use crate::error::EngineError;
use crate::math::fixed_point::{BPS_DENOMINATOR, checked_mul, isqrt, mul_div, narrow};
use crate::token::TokenAmount;
use crate::value_objects::Percentage;
use primitive_types::{U256, U512};
use rust_decimal::Decimal;

/// Calculates the output amount for a given input amount in a constant product pool (x * y = k).
///
/// formula: dy = y * dx / (x + dx)
/// taking fee into account: dy = y * (dx * (10000 - fee)) / (x * 10000 + dx * (10000 - fee))
pub fn calculate_out_amount(
    amount_in: TokenAmount,
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
    fee_bps: u32,
) -> Result<TokenAmount, EngineError> {
    let amount_in = amount_in.0;
    let reserve_in = reserve_in.0;
    let reserve_out = reserve_out.0;

    if amount_in.is_zero() {
        return Ok(TokenAmount::zero());
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(EngineError::DivisionByZero("empty reserves"));
    }
    if fee_bps > BPS_DENOMINATOR {
        return Err(EngineError::InvalidFeeRate(fee_bps, BPS_DENOMINATOR));
    }

    let amount_in_with_fee = checked_mul(
        amount_in,
        U256::from(BPS_DENOMINATOR - fee_bps),
        "swap input with fee",
    )?;
    let numerator = checked_mul(amount_in_with_fee, reserve_out, "swap numerator")?;
    let denominator = checked_mul(reserve_in, U256::from(BPS_DENOMINATOR), "swap denominator")?
        .checked_add(amount_in_with_fee)
        .ok_or(EngineError::ArithmeticOverflow("swap denominator"))?;

    Ok(TokenAmount(numerator / denominator))
}

/// Calculates the spot price of token_in in terms of token_out
/// Price = reserve_out / reserve_in
pub fn calculate_spot_price(
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
) -> Result<Decimal, EngineError> {
    let r_in = reserve_in
        .to_decimal()
        .ok_or(EngineError::ArithmeticOverflow("spot price conversion"))?;
    let r_out = reserve_out
        .to_decimal()
        .ok_or(EngineError::ArithmeticOverflow("spot price conversion"))?;

    if r_in.is_zero() {
        return Err(EngineError::DivisionByZero("spot price"));
    }

    r_out
        .checked_div(r_in)
        .ok_or(EngineError::ArithmeticOverflow("spot price"))
}

/// Calculates the constant product K without loss of range.
pub fn calculate_k(reserve0: TokenAmount, reserve1: TokenAmount) -> U512 {
    reserve0.0.full_mul(reserve1.0)
}

/// Relative drop of the marginal price `reserve_out / reserve_in` caused by a trade.
///
/// `impact = 1 - (new_out * old_in) / (old_out * new_in)`
pub fn calculate_price_impact(
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
    new_reserve_in: TokenAmount,
    new_reserve_out: TokenAmount,
) -> Result<Percentage, EngineError> {
    let before = reserve_out.0.full_mul(new_reserve_in.0);
    let after = new_reserve_out.0.full_mul(reserve_in.0);
    if before.is_zero() {
        return Err(EngineError::DivisionByZero("price impact"));
    }
    if after >= before {
        return Ok(Percentage::ZERO);
    }

    // Drop low bits so both terms fit comfortably in 256 bits.
    let shift = before.bits().saturating_sub(192);
    let denominator = narrow(before >> shift).ok_or(EngineError::ArithmeticOverflow("price impact"))?;
    let numerator = narrow((before - after) >> shift)
        .ok_or(EngineError::ArithmeticOverflow("price impact"))?;

    Percentage::from_ratio(numerator, denominator)
        .ok_or(EngineError::ArithmeticOverflow("price impact"))
}

/// Shares minted by the first deposit: `floor(sqrt(a * b)) - minimum_liquidity`.
pub fn initial_shares(
    amount_a: TokenAmount,
    amount_b: TokenAmount,
    minimum_liquidity: TokenAmount,
) -> Result<TokenAmount, EngineError> {
    let root = isqrt(checked_mul(amount_a.0, amount_b.0, "initial liquidity")?);
    if root <= minimum_liquidity.0 {
        return Err(EngineError::InsufficientInitialLiquidity(TokenAmount(root)));
    }
    Ok(TokenAmount(root - minimum_liquidity.0))
}

/// Shares minted by a later deposit: the smaller of the two proportional claims.
pub fn proportional_shares(
    amount_a: TokenAmount,
    amount_b: TokenAmount,
    reserve_a: TokenAmount,
    reserve_b: TokenAmount,
    total_shares: TokenAmount,
) -> Result<TokenAmount, EngineError> {
    let by_a = mul_div(amount_a.0, total_shares.0, reserve_a.0, "shares for asset a")?;
    let by_b = mul_div(amount_b.0, total_shares.0, reserve_b.0, "shares for asset b")?;
    Ok(TokenAmount(by_a.min(by_b)))
}

/// Amount of `other` matching `amount` at the current reserve ratio (floor).
pub fn quote_counterpart(
    amount: TokenAmount,
    reserve: TokenAmount,
    reserve_other: TokenAmount,
) -> Result<TokenAmount, EngineError> {
    mul_div(amount.0, reserve_other.0, reserve.0, "ratio quote").map(TokenAmount)
}

/// Reserves owed to `shares` out of `total_shares` (floor, favours the pool).
pub fn withdrawal_amount(
    shares: TokenAmount,
    reserve: TokenAmount,
    total_shares: TokenAmount,
) -> Result<TokenAmount, EngineError> {
    mul_div(shares.0, reserve.0, total_shares.0, "withdrawal").map(TokenAmount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_calculate_out_amount() {
        // 1000 reserve0, 1000 reserve1, 10 input, 0.3% fee (30 bps)
        // amount_in_with_fee = 10 * 9970 = 99700 (scaled by 10000)
        // numerator = 99700 * 1000 = 99,700,000
        // denominator = 1000 * 10000 + 99700 = 10,099,700
        // out = 99,700,000 / 10,099,700 = 9.8715... -> 9

        let r0 = TokenAmount::from(1000u64);
        let r1 = TokenAmount::from(1000u64);
        let input = TokenAmount::from(10u64);
        let fee = 30;

        let out = calculate_out_amount(input, r0, r1, fee).unwrap();
        assert_eq!(out.0.as_u64(), 9);
    }

    #[test]
    fn test_calculate_out_amount_hand_computed() {
        // 19,940,000 / 1,099,700 = 18.13 -> 18
        let out = calculate_out_amount(
            TokenAmount::from(10u64),
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
            30,
        )
        .unwrap();
        assert_eq!(out, TokenAmount::from(18u64));
    }

    #[test]
    fn test_calculate_out_amount_edges() {
        let zero = calculate_out_amount(
            TokenAmount::zero(),
            TokenAmount::from(1u64),
            TokenAmount::from(1u64),
            30,
        )
        .unwrap();
        assert!(zero.is_zero());

        let empty = calculate_out_amount(
            TokenAmount::from(1u64),
            TokenAmount::zero(),
            TokenAmount::from(1u64),
            30,
        );
        assert_eq!(empty, Err(EngineError::DivisionByZero("empty reserves")));

        let overflow = calculate_out_amount(
            TokenAmount(U256::MAX / U256::from(2u64)),
            TokenAmount::from(1u64),
            TokenAmount::from(1u64),
            30,
        );
        assert!(matches!(overflow, Err(EngineError::ArithmeticOverflow(_))));
    }

    #[test]
    fn test_calculate_spot_price() {
        let r0 = TokenAmount::from(2000u64);
        let r1 = TokenAmount::from(1000u64);

        let price = calculate_spot_price(r0, r1).unwrap();
        // price = 1000 / 2000 = 0.5
        assert_eq!(price, Decimal::from_str("0.5").unwrap());
    }

    #[test]
    fn test_price_impact() {
        // 100/200 -> 110/182: price 2.0 -> 1.6545..., impact = 1 - 182*100/(200*110)
        let impact = calculate_price_impact(
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
            TokenAmount::from(110u64),
            TokenAmount::from(182u64),
        )
        .unwrap();
        // 1 - 18200/22000 = 3800/22000 = 0.172727...
        assert_eq!(impact.0.round_dp(6), dec!(0.172727));

        let none = calculate_price_impact(
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
        )
        .unwrap();
        assert_eq!(none, Percentage::ZERO);
    }

    #[test]
    fn test_price_impact_large_reserves() {
        let big = TokenAmount(U256::MAX / U256::from(4u64));
        let impact = calculate_price_impact(
            big,
            big,
            TokenAmount(big.0 * U256::from(2u64)),
            TokenAmount(big.0 / U256::from(2u64)),
        )
        .unwrap();
        assert_eq!(impact.0.round_dp(6), dec!(0.75));
    }

    #[test]
    fn test_initial_shares() {
        let shares = initial_shares(
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
            TokenAmount::from(100u64),
        )
        .unwrap();
        assert_eq!(shares, TokenAmount::from(41u64));

        let too_small = initial_shares(
            TokenAmount::from(10u64),
            TokenAmount::from(10u64),
            TokenAmount::from(100u64),
        );
        assert!(matches!(
            too_small,
            Err(EngineError::InsufficientInitialLiquidity(_))
        ));
    }

    #[test]
    fn test_proportional_shares_takes_minimum() {
        let shares = proportional_shares(
            TokenAmount::from(10u64),
            TokenAmount::from(40u64),
            TokenAmount::from(100u64),
            TokenAmount::from(200u64),
            TokenAmount::from(1000u64),
        )
        .unwrap();
        assert_eq!(shares, TokenAmount::from(100u64));
    }

    #[test]
    fn test_calculate_k() {
        let k = calculate_k(TokenAmount(U256::MAX), TokenAmount::from(2u64));
        assert_eq!(k, U256::MAX.full_mul(U256::from(2u64)));
    }
}
