use crate::RESOLUTION;
use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up, unlikely};
use crate::{
    Q96, U160_MAX,
    error::{Error, MathError, StateError},
};
use alloy_primitives::{I256, U256};

/// Computes the next sqrt price after swapping token0, rounding the
/// resulting price up, given current price, liquidity, amount, and
/// whether the amount is added or removed.
///
/// Rounding up keeps the price from moving further than the exact
/// amount would justify, in either direction.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    if amount.is_zero() {
        return Ok(sqrt_p_x96);
    }

    let numerator1: U256 = U256::from(liquidity) << RESOLUTION;
    let product: U256 = amount.wrapping_mul(sqrt_p_x96);

    if add {
        if product / amount == sqrt_p_x96 {
            let denominator = numerator1.wrapping_add(product);
            if denominator >= numerator1 {
                return mul_div_rounding_up(numerator1, sqrt_p_x96, denominator)
                    .map_err(Error::from);
            }
        }
        let denominator = (numerator1 / sqrt_p_x96)
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        Ok(div_rounding_up(numerator1, denominator))
    } else {
        if product / amount != sqrt_p_x96 || numerator1 <= product {
            return Err(StateError::InsufficientReserves.into());
        }
        let denominator = numerator1 - product;
        mul_div_rounding_up(numerator1, sqrt_p_x96, denominator).map_err(Error::from)
    }
}

/// Computes the next sqrt price after swapping token1, rounding the
/// resulting price down, given current price, liquidity, amount, and
/// direction (add/remove).
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    let liquidity = U256::from(liquidity);
    if add {
        let quotient: U256 = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };

        let result = sqrt_p_x96
            .checked_add(quotient)
            .ok_or(MathError::Overflow)?;
        if result <= U160_MAX {
            Ok(result)
        } else {
            Err(MathError::Overflow.into())
        }
    } else {
        let quotient: U256 = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };

        if sqrt_p_x96 <= quotient {
            return Err(StateError::InsufficientReserves.into());
        }
        Ok(sqrt_p_x96 - quotient)
    }
}

/// Core helper for computing the token0 amount delta between two
/// sqrt prices for a given liquidity, optionally rounding up.
///
/// `liquidity * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b)`; the prices may be
/// passed in either order.
pub fn get_amount_0_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_a_x96.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b_x96)?,
            sqrt_ratio_a_x96,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_ratio_b_x96)? / sqrt_ratio_a_x96)
    }
}

/// Core helper for computing the token1 amount delta between two
/// sqrt prices for a given liquidity, optionally rounding up.
pub fn get_amount_1_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    } else {
        mul_div(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    }
}

/// Signed token0 delta for a signed liquidity change: positive liquidity
/// (the pool receives tokens) rounds up, negative rounds down.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, Error> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Signed token1 delta for a signed liquidity change, rounded like
/// [`get_amount_0_delta`].
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Computes the next sqrt price when swapping *into* the pool
/// (`amount_in`), choosing the correct branch for token0/token1
/// depending on `zero_for_one`.
pub fn get_next_sqrt_price_from_input(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if unlikely(sqrt_p_x96.is_zero()) {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if unlikely(liquidity == 0) {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_in, true)
    }
}

/// Computes the next sqrt price when swapping *out of* the pool
/// (`amount_out`), choosing the correct branch for token0/token1
/// depending on `zero_for_one`.
pub fn get_next_sqrt_price_from_output(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if unlikely(sqrt_p_x96.is_zero()) {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if unlikely(liquidity == 0) {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_out, false)
    }
}
