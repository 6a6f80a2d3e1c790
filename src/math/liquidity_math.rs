use crate::Q96;
use crate::error::{Error, MathError};
use crate::math::math_helpers::{checked_u128, mul_div};
use crate::math::sqrt_price_math::{get_amount_0_delta_base, get_amount_1_delta_base};
use alloy_primitives::U256;

/// Adds a signed liquidity delta to an unsigned liquidity value,
/// failing instead of wrapping in either direction.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        let z = x.overflowing_sub(y.unsigned_abs());
        if z.1 {
            return Err(MathError::Underflow);
        }
        Ok(z.0)
    } else {
        let z = x.overflowing_add(y as u128);
        if z.1 {
            return Err(MathError::Overflow);
        }
        Ok(z.0)
    }
}

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b { (b, a) } else { (a, b) }
}

/// Liquidity received for `amount0` of token0 over `[sqrt_a, sqrt_b]`.
pub fn get_liquidity_for_amount_0(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount0: U256,
) -> Result<u128, MathError> {
    let (a, b) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let intermediate = mul_div(a, b, Q96)?;
    checked_u128(mul_div(amount0, intermediate, b - a)?)
}

/// Liquidity received for `amount1` of token1 over `[sqrt_a, sqrt_b]`.
pub fn get_liquidity_for_amount_1(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (a, b) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    checked_u128(mul_div(amount1, Q96, b - a)?)
}

/// Maximum liquidity a position over `[sqrt_a, sqrt_b]` can hold given
/// both token budgets at the current price. Inside the range the scarcer
/// side binds.
pub fn max_liquidity_for_amounts(
    sqrt_price_x96: U256,
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (a, b) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if a == b {
        return Err(MathError::DivisionByZero);
    }

    if sqrt_price_x96 <= a {
        get_liquidity_for_amount_0(a, b, amount0)
    } else if sqrt_price_x96 < b {
        let liquidity0 = get_liquidity_for_amount_0(sqrt_price_x96, b, amount0)?;
        let liquidity1 = get_liquidity_for_amount_1(a, sqrt_price_x96, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount_1(a, b, amount1)
    }
}

/// Token amounts (rounded down) that `liquidity` over `[sqrt_a, sqrt_b]`
/// is worth at the current price. Used to value positions off-chain.
pub fn get_amounts_for_liquidity(
    sqrt_price_x96: U256,
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
) -> Result<(U256, U256), Error> {
    let (a, b) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

    if sqrt_price_x96 <= a {
        Ok((get_amount_0_delta_base(a, b, liquidity, false)?, U256::ZERO))
    } else if sqrt_price_x96 < b {
        Ok((
            get_amount_0_delta_base(sqrt_price_x96, b, liquidity, false)?,
            get_amount_1_delta_base(a, sqrt_price_x96, liquidity, false)?,
        ))
    } else {
        Ok((U256::ZERO, get_amount_1_delta_base(a, b, liquidity, false)?))
    }
}
