use crate::U256_E6;
use crate::error::Error;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta_base, get_amount_1_delta_base, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use alloy_primitives::{I256, U256};

/// Computes one step of a swap inside a single liquidity range.
///
/// `amount_remaining` is signed: positive means exact input, negative
/// means exact output. The direction is implied by the target price
/// (`target <= current` is token0 → token1). Returns
/// `(sqrt_ratio_next_x96, amount_in, amount_out, fee_amount)`, where the
/// next price never passes `sqrt_ratio_target_x96`. `amount_in` and the
/// fee round up, `amount_out` rounds down.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<(U256, U256, U256, U256), Error> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = !amount_remaining.is_negative();
    let fee = U256::from(fee_pips);

    let sqrt_ratio_next_x96: U256;
    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    if exact_in {
        let amount_remaining_less_fee =
            mul_div(amount_remaining.into_raw(), U256_E6 - fee, U256_E6)?;

        amount_in = if zero_for_one {
            get_amount_0_delta_base(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?
        } else {
            get_amount_1_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                true,
            )?
        };

        sqrt_ratio_next_x96 = if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        amount_out = if zero_for_one {
            get_amount_1_delta_base(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?
        } else {
            get_amount_0_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                false,
            )?
        };

        let amount_out_wanted = amount_remaining.unsigned_abs();
        sqrt_ratio_next_x96 = if amount_out_wanted >= amount_out {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                amount_out_wanted,
                zero_for_one,
            )?
        };
    }

    let max = sqrt_ratio_target_x96 == sqrt_ratio_next_x96;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in = get_amount_0_delta_base(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_1_delta_base(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && exact_in) {
            amount_in = get_amount_1_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_0_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                false,
            )?;
        }
    }

    // exact output never hands out more than was asked for
    if !exact_in && amount_out > amount_remaining.unsigned_abs() {
        amount_out = amount_remaining.unsigned_abs();
    }

    let fee_amount = if exact_in && sqrt_ratio_next_x96 != sqrt_ratio_target_x96 {
        // the target was not reached, so the remainder of the input is the fee
        amount_remaining.into_raw() - amount_in
    } else {
        mul_div_rounding_up(amount_in, fee, U256_E6 - fee)?
    };

    Ok((sqrt_ratio_next_x96, amount_in, amount_out, fee_amount))
}
