use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::{mul_div, unlikely};
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::core_pool::CorePool;
use crate::{Q128, U256_1};
use alloy_primitives::{I256, U256};
use std::ops::{Add, Sub};
use tracing::debug;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapParams {
    /// Swap direction: `true` for token0 → token1, `false` for token1 → token0.
    pub zero_for_one: bool,
    /// Signed amount being swapped. Positive means “exact in”, negative means “exact out”.
    pub amount_specified: I256,
    /// Sqrt‑price limit in Q96 that bounds how far the price is allowed to move.
    ///
    /// `None` lets the price run to one step inside the global bounds.
    pub sqrt_price_limit_x96: Option<U256>,
}

impl SwapParams {
    #[inline]
    pub fn new(
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Self {
        Self {
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        }
    }

    /// Limit used when none is given.
    #[inline]
    pub fn default_limit(zero_for_one: bool) -> U256 {
        if zero_for_one {
            MIN_SQRT_RATIO + U256_1
        } else {
            MAX_SQRT_RATIO - U256_1
        }
    }
}

/// Signed token deltas from the pool's point of view (positive is paid
/// into the pool) and the pool state the swap ends in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    pub amount0: I256,
    pub amount1: I256,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
    pub fees_paid: U256,
}

// fee growth seen by a tick when the swap crossed it
#[derive(Copy, Clone, Debug)]
pub(crate) struct TickCrossing {
    tick: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
}

/// Everything a swap would change, computed against an untouched pool.
#[derive(Clone, Debug)]
pub(crate) struct SwapOutcome {
    pub(crate) result: SwapResult,
    zero_for_one: bool,
    fee_growth_global_x128: U256,
    crossings: Vec<TickCrossing>,
}

// the top level state of the swap, the results of which are recorded in storage at the end
struct SwapState {
    // the amount remaining to be swapped in/out of the input/output asset
    amount_specified_remaining: I256,
    // the amount already swapped out/in of the output/input asset
    amount_calculated: I256,
    // current sqrt(price)
    sqrt_price_x96: U256,
    // the tick associated with the current price
    tick: i32,
    // the global fee growth of the input token
    fee_growth_global_x128: U256,
    // the current liquidity in range
    liquidity: u128,
    // accumulated swap fees
    swap_fee: U256,
}

#[derive(Default)]
struct StepComputations {
    // the price at the beginning of the step
    sqrt_price_start_x96: U256,
    // the next tick to swap to from the current tick in the swap direction
    tick_next: i32,
    // whether tickNext is initialized or not
    initialized: bool,
    // sqrt(price) for the next tick (1/0)
    sqrt_price_next_x96: U256,
    // how much is being swapped in this step
    amount_in: U256,
    // how much is being swapped out
    amount_out: U256,
    // how much fee is being paid in
    fee_amount: U256,
}

impl CorePool {
    /// Executes a swap and commits the resulting price, liquidity, fee
    /// growth, crossed ticks and balances.
    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let outcome = self.simulate_swap(SwapParams::new(
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        ))?;
        self.commit_swap(outcome)
    }

    /// Runs the swap algorithm without modifying the pool.
    pub fn query_swap(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        self.simulate_swap(SwapParams::new(
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        ))
        .map(|outcome| outcome.result)
    }

    pub(crate) fn simulate_swap(&self, params: SwapParams) -> Result<SwapOutcome, Error> {
        self.require_initialized("swap")?;

        let amount_specified = params.amount_specified;
        if unlikely(amount_specified.is_zero()) {
            return Err(PoolError::AmountSpecifiedIsZero.into());
        }

        let zero_for_one = params.zero_for_one;
        let sqrt_price_limit_x96 = params
            .sqrt_price_limit_x96
            .unwrap_or_else(|| SwapParams::default_limit(zero_for_one));
        let invalid_limit = if zero_for_one {
            sqrt_price_limit_x96 >= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 <= MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 <= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        };
        if unlikely(invalid_limit) {
            return Err(PoolError::InvalidPriceLimit {
                zero_for_one,
                limit: sqrt_price_limit_x96,
                current: self.slot0.sqrt_price_x96,
            }
            .into());
        }

        let exact_input: bool = amount_specified.is_positive();

        let mut state: SwapState = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.slot0.sqrt_price_x96,
            tick: self.slot0.tick,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            liquidity: self.liquidity,
            swap_fee: U256::ZERO,
        };
        let mut crossings = Vec::new();

        while (state.amount_specified_remaining != I256::ZERO)
            && (state.sqrt_price_x96 != sqrt_price_limit_x96)
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            (step.tick_next, step.initialized) = self.ticks.next_initialized_tick_within_one_word(
                state.tick,
                self.config.tick_spacing,
                zero_for_one,
            );

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);

            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.fee_amount,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                if zero_for_one {
                    if step.sqrt_price_next_x96 < sqrt_price_limit_x96 {
                        sqrt_price_limit_x96
                    } else {
                        step.sqrt_price_next_x96
                    }
                } else if step.sqrt_price_next_x96 > sqrt_price_limit_x96 {
                    sqrt_price_limit_x96
                } else {
                    step.sqrt_price_next_x96
                },
                state.liquidity,
                state.amount_specified_remaining,
                self.config.fee_pips,
            )?;

            state.swap_fee = state.swap_fee.wrapping_add(step.fee_amount);

            if exact_input {
                state.amount_specified_remaining -=
                    I256::from_raw(step.amount_in + step.fee_amount);
                state.amount_calculated =
                    state.amount_calculated.sub(I256::from_raw(step.amount_out));
            } else {
                state.amount_specified_remaining += I256::from_raw(step.amount_out);
                state.amount_calculated = state
                    .amount_calculated
                    .add(I256::from_raw(step.amount_in + step.fee_amount));
            }

            if state.liquidity > 0 {
                state.fee_growth_global_x128 = state.fee_growth_global_x128.wrapping_add(mul_div(
                    step.fee_amount,
                    Q128,
                    U256::from(state.liquidity),
                )?);
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let (fee_growth_global_0_x128, fee_growth_global_1_x128) = if zero_for_one {
                        (state.fee_growth_global_x128, self.fee_growth_global_1_x128)
                    } else {
                        (self.fee_growth_global_0_x128, state.fee_growth_global_x128)
                    };
                    crossings.push(TickCrossing {
                        tick: step.tick_next,
                        fee_growth_global_0_x128,
                        fee_growth_global_1_x128,
                    });

                    let mut liquidity_net = self
                        .ticks
                        .get(step.tick_next)
                        .map(|info| info.liquidity_net)
                        .unwrap_or_default();
                    if zero_for_one {
                        liquidity_net = liquidity_net.checked_neg().ok_or(MathError::Overflow)?;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let (amount0, amount1): (I256, I256) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        Ok(SwapOutcome {
            result: SwapResult {
                amount0,
                amount1,
                sqrt_price_x96: state.sqrt_price_x96,
                tick: state.tick,
                liquidity: state.liquidity,
                fees_paid: state.swap_fee,
            },
            zero_for_one,
            fee_growth_global_x128: state.fee_growth_global_x128,
            crossings,
        })
    }

    fn commit_swap(&mut self, outcome: SwapOutcome) -> Result<SwapResult, Error> {
        let result = outcome.result;
        let token0_balance = apply_delta(self.token0_balance, result.amount0)?;
        let token1_balance = apply_delta(self.token1_balance, result.amount1)?;

        for crossing in &outcome.crossings {
            self.ticks.cross(
                crossing.tick,
                crossing.fee_growth_global_0_x128,
                crossing.fee_growth_global_1_x128,
            );
        }
        if outcome.zero_for_one {
            self.fee_growth_global_0_x128 = outcome.fee_growth_global_x128;
        } else {
            self.fee_growth_global_1_x128 = outcome.fee_growth_global_x128;
        }
        self.slot0 = Slot0 {
            sqrt_price_x96: result.sqrt_price_x96,
            tick: result.tick,
        };
        self.liquidity = result.liquidity;
        self.token0_balance = token0_balance;
        self.token1_balance = token1_balance;

        debug!(
            zero_for_one = outcome.zero_for_one,
            amount0 = %result.amount0,
            amount1 = %result.amount1,
            tick = result.tick,
            crossed = outcome.crossings.len(),
            "swap"
        );
        Ok(result)
    }
}

fn apply_delta(balance: U256, delta: I256) -> Result<U256, Error> {
    if delta.is_negative() {
        Ok(balance
            .checked_sub(delta.unsigned_abs())
            .ok_or(MathError::Underflow)?)
    } else {
        Ok(balance
            .checked_add(delta.into_raw())
            .ok_or(MathError::Overflow)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::core_pool::tests::{initialized_pool, owner};
    use alloy_primitives::Address;
    use std::str::FromStr;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn u(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    fn signed(x: u128) -> I256 {
        I256::from_raw(U256::from(x))
    }

    fn pool_with_range() -> CorePool {
        let mut pool = initialized_pool();
        pool.mint(owner(), -600, 600, E18).unwrap();
        pool
    }

    // ---------------- Basic validation tests ----------------

    #[test]
    fn swap_rejects_zero_amount_specified() {
        let mut pool = pool_with_range();
        let err = pool.swap(true, I256::ZERO, None).unwrap_err();

        match err {
            Error::PoolError(PoolError::AmountSpecifiedIsZero) => {}
            other => panic!("expected AmountSpecifiedIsZero, got: {:?}", other),
        }
    }

    #[test]
    fn swap_rejects_sqrt_price_limit_out_of_bounds_zero_for_one() {
        let mut pool = pool_with_range();
        let current = pool.sqrt_price_x96();

        // limit >= current price should be rejected for zero_for_one
        for limit in [current, current + U256_1, MIN_SQRT_RATIO] {
            assert!(matches!(
                pool.swap(true, signed(1_000), Some(limit)),
                Err(Error::PoolError(PoolError::InvalidPriceLimit { .. }))
            ));
        }
    }

    #[test]
    fn swap_rejects_sqrt_price_limit_out_of_bounds_one_for_zero() {
        let mut pool = pool_with_range();
        let current = pool.sqrt_price_x96();

        for limit in [current, current - U256_1, MAX_SQRT_RATIO] {
            assert!(matches!(
                pool.swap(false, signed(1_000), Some(limit)),
                Err(Error::PoolError(PoolError::InvalidPriceLimit { .. }))
            ));
        }
    }

    #[test]
    fn swap_requires_initialized_pool() {
        let mut pool = CorePool::new(*initialized_pool().config());
        assert_eq!(
            pool.swap(true, signed(1), None).unwrap_err(),
            Error::PoolError(PoolError::NotInitialized { operation: "swap" })
        );
    }

    // ---------------- Behaviour tests ----------------

    #[test]
    fn exact_input_zero_for_one_within_range() {
        let mut pool = pool_with_range();
        let result = pool.swap(true, signed(1_000_000_000_000_000), None).unwrap();

        assert_eq!(result.amount0, signed(1_000_000_000_000_000));
        assert_eq!(result.amount1, -signed(996006981039903));
        assert_eq!(result.sqrt_price_x96, u("79149250711305166342700278159"));
        assert_eq!(result.tick, -20);
        assert_eq!(result.fees_paid, U256::from(3_000_000_000_000u64));

        assert_eq!(pool.tick_current(), -20);
        assert_eq!(pool.liquidity(), E18);
        assert_eq!(
            pool.fee_growth_global_0_x128(),
            u("1020847100762815390390123822295304")
        );
        assert_eq!(pool.fee_growth_global_1_x128(), U256::ZERO);
        assert_eq!(
            pool.token1_balance(),
            U256::from(29553010879137170u64 - 996006981039903u64)
        );
    }

    #[test]
    fn exact_output_one_for_zero_within_range() {
        let mut pool = pool_with_range();
        let result = pool
            .swap(false, -signed(1_000_000_000_000_000), None)
            .unwrap();

        assert_eq!(result.amount0, -signed(1_000_000_000_000_000));
        assert_eq!(result.amount1, signed(1004013040121367));
        assert_eq!(result.sqrt_price_x96, u("79307469984248586179723674011"));
        assert_eq!(result.tick, 20);
        assert_eq!(result.fees_paid, U256::from(3012039120365u64));
        assert_eq!(
            pool.fee_growth_global_1_x128(),
            u("1024943801136263662990517543963260")
        );
    }

    #[test]
    fn crossing_a_tick_updates_liquidity_and_fee_growth_outside() {
        let mut pool = pool_with_range();
        pool.mint(owner(), -1200, -600, E18 / 2).unwrap();

        let result = pool.swap(true, signed(40_000_000_000_000_000), None).unwrap();

        assert_eq!(result.amount0, signed(40_000_000_000_000_000));
        assert_eq!(result.amount1, -signed(38271541247902345));
        assert_eq!(result.sqrt_price_x96, u("75505225483662083221495729851"));
        assert_eq!(result.tick, -963);
        assert_eq!(result.liquidity, E18 / 2);
        assert_eq!(result.fees_paid, U256::from(120000000000001u64));

        assert_eq!(pool.liquidity(), E18 / 2);
        assert_eq!(
            pool.fee_growth_global_0_x128(),
            u("50486379000730442664504693835696009")
        );
        let crossed = pool.get_tick(-600).unwrap();
        assert_eq!(
            crossed.fee_growth_outside_0_x128,
            u("31181389060295469131439053824855286")
        );
        assert_eq!(crossed.fee_growth_outside_1_x128, U256::ZERO);
        assert_eq!(pool.token0_balance(), U256::from(69553010879137170u64));
        assert_eq!(pool.token1_balance(), U256::from(5621284844792210u64));
    }

    #[test]
    fn crossing_a_tick_upward_flips_fee_growth_outside_1() {
        let mut pool = pool_with_range();
        let upper = Address::with_last_byte(0xbb);
        pool.mint(upper, 600, 1200, E18 / 2).unwrap();
        assert_eq!(pool.get_tick(600).unwrap().fee_growth_outside_1_x128, U256::ZERO);

        let result = pool.swap(false, signed(40_000_000_000_000_000), None).unwrap();
        assert!(result.tick >= 600 && result.tick < 1200);
        assert!(result.amount0.is_negative());
        assert_eq!(result.liquidity, E18 / 2);
        assert_eq!(pool.liquidity(), E18 / 2);

        // outside flipped to the growth accrued below 600 at crossing time
        let global = pool.fee_growth_global_1_x128();
        let crossed = pool.get_tick(600).unwrap();
        let below = crossed.fee_growth_outside_1_x128;
        assert!(below > U256::ZERO && below < global);
        assert_eq!(crossed.fee_growth_outside_0_x128, U256::ZERO);
        assert_eq!(pool.get_tick(1200).unwrap().fee_growth_outside_1_x128, U256::ZERO);

        // the range that started above the price earns only what came after
        pool.burn(upper, 600, 1200, 0).unwrap();
        let earned = mul_div(global - below, U256::from(E18 / 2), Q128).unwrap();
        assert!(earned > U256::ZERO);
        assert_eq!(
            U256::from(pool.get_position(upper, 600, 1200).unwrap().tokens_owed_1),
            earned
        );

        pool.burn(owner(), -600, 600, 0).unwrap();
        let earned = mul_div(below, U256::from(E18), Q128).unwrap();
        assert_eq!(
            U256::from(pool.get_position(owner(), -600, 600).unwrap().tokens_owed_1),
            earned
        );
    }

    #[test]
    fn negative_balance_is_an_arithmetic_bound() {
        let err = apply_delta(U256::from(5u8), -signed(6)).unwrap_err();
        assert_eq!(err, Error::MathError(MathError::Underflow));
        assert!(err.is_arithmetic_bound());
        assert_eq!(apply_delta(U256::from(5u8), -signed(5)).unwrap(), U256::ZERO);
    }

    #[test]
    fn swap_stops_at_price_limit() {
        let mut pool = pool_with_range();
        let limit = get_sqrt_ratio_at_tick(-300).unwrap();
        let result = pool.swap(true, signed(E18), Some(limit)).unwrap();

        assert_eq!(result.sqrt_price_x96, limit);
        assert_eq!(result.tick, -300);
        assert_eq!(result.amount0, signed(15157776661943658));
        assert_eq!(result.amount1, -signed(14887321611957513));
        assert_eq!(result.fees_paid, U256::from(45473329985831u64));
    }

    #[test]
    fn query_swap_matches_swap_without_mutation() {
        let pool = pool_with_range();
        let mut applied = pool.clone();

        let quoted = pool.query_swap(true, signed(1_000_000_000_000_000), None).unwrap();
        assert_eq!(pool, pool_with_range());

        let executed = applied.swap(true, signed(1_000_000_000_000_000), None).unwrap();
        assert_eq!(quoted, executed);
    }

    #[test]
    fn swap_without_liquidity_moves_price_to_limit() {
        let mut pool = initialized_pool();
        let limit = get_sqrt_ratio_at_tick(-6000).unwrap();
        let result = pool.swap(true, signed(1_000), Some(limit)).unwrap();
        assert_eq!(result.amount0, I256::ZERO);
        assert_eq!(result.amount1, I256::ZERO);
        assert_eq!(pool.sqrt_price_x96(), limit);
        assert_eq!(pool.tick_current(), -6000);
    }

    #[test]
    fn fees_are_collectable_after_poke() {
        let mut pool = pool_with_range();
        pool.swap(true, signed(1_000_000_000_000_000), None).unwrap();

        let poked = pool.burn(owner(), -600, 600, 0).unwrap();
        assert_eq!(poked.amount0, U256::ZERO);
        assert_eq!(poked.amount1, U256::ZERO);

        let position = pool.get_position(owner(), -600, 600).unwrap();
        assert_eq!(position.tokens_owed_0, 2999999999999);
        assert_eq!(position.tokens_owed_1, 0);

        let collected = pool.collect(owner(), -600, 600, u128::MAX, u128::MAX).unwrap();
        assert_eq!(collected.amount0, U256::from(2999999999999u64));
        assert_eq!(pool.get_position(owner(), -600, 600).unwrap().tokens_owed_0, 0);
    }

    #[test]
    fn round_trip_swap_returns_price_near_start() {
        let mut pool = pool_with_range();
        let start = pool.sqrt_price_x96();
        let out = pool.swap(true, signed(1_000_000_000_000), None).unwrap();
        assert_eq!(out.tick, -1);

        // buy the same token0 back as exact output
        let back = pool.swap(false, -out.amount0, None).unwrap();
        assert_eq!(back.amount1, signed(1003008030092));
        assert_eq!(pool.tick_current(), 0);
        assert!(pool.sqrt_price_x96() >= start);
    }
}
