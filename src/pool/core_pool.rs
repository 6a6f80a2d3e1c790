use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::low_u128;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_math::{
    MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, max_liquidity_per_tick,
};
use crate::pool::pool_config::PoolConfig;
use crate::pool::position::{Position, PositionIndex, PositionKey};
use crate::pool::swap::Slot0;
use crate::pool::tick::{Tick, TickIndex, fee_growth_inside};
use alloy_primitives::{Address, I256, U256};
use tracing::debug;

/// Unsigned token amounts moved by a liquidity operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenAmounts {
    pub amount0: U256,
    pub amount1: U256,
}

impl TokenAmounts {
    #[inline]
    pub fn new(amount0: U256, amount1: U256) -> Self {
        Self { amount0, amount1 }
    }
}

/// In-memory concentrated-liquidity pool.
///
/// Every operation either applies completely or returns an error with the
/// pool unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorePool {
    pub(crate) config: PoolConfig,
    pub(crate) token0_balance: U256,
    pub(crate) token1_balance: U256,
    pub(crate) slot0: Slot0,
    pub(crate) liquidity: u128,
    pub(crate) fee_growth_global_0_x128: U256,
    pub(crate) fee_growth_global_1_x128: U256,
    pub(crate) ticks: TickIndex,
    pub(crate) positions: PositionIndex,
}

// Fully evaluated liquidity change, applied with `commit_modify`.
struct ModifyPosition {
    key: PositionKey,
    position: Position,
    lower: Option<Tick>,
    upper: Option<Tick>,
    liquidity: u128,
    amount0: I256,
    amount1: I256,
}

impl CorePool {
    /// Creates an uninitialized pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            token0_balance: U256::ZERO,
            token1_balance: U256::ZERO,
            slot0: Slot0::default(),
            liquidity: 0,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            ticks: TickIndex::new(),
            positions: PositionIndex::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.slot0.sqrt_price_x96.is_zero()
    }

    #[inline]
    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    #[inline]
    pub fn sqrt_price_x96(&self) -> U256 {
        self.slot0.sqrt_price_x96
    }

    #[inline]
    pub fn tick_current(&self) -> i32 {
        self.slot0.tick
    }

    /// Liquidity active at the current price.
    #[inline]
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    #[inline]
    pub fn fee_growth_global_0_x128(&self) -> U256 {
        self.fee_growth_global_0_x128
    }

    #[inline]
    pub fn fee_growth_global_1_x128(&self) -> U256 {
        self.fee_growth_global_1_x128
    }

    #[inline]
    pub fn token0_balance(&self) -> U256 {
        self.token0_balance
    }

    #[inline]
    pub fn token1_balance(&self) -> U256 {
        self.token1_balance
    }

    pub fn get_tick(&self, tick: i32) -> Option<&Tick> {
        self.ticks.get(tick)
    }

    pub fn get_position(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Option<&Position> {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
    }

    pub fn ticks(&self) -> &TickIndex {
        &self.ticks
    }

    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    pub(crate) fn require_initialized(&self, operation: &'static str) -> Result<(), PoolError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(PoolError::NotInitialized { operation })
        }
    }

    /// Sets the starting price. Allowed exactly once.
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<(), Error> {
        if self.is_initialized() {
            return Err(PoolError::AlreadyInitialized {
                sqrt_price_x96: self.slot0.sqrt_price_x96,
            }
            .into());
        }
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        self.slot0 = Slot0 {
            sqrt_price_x96,
            tick,
        };
        debug!(pool = %self.config, %sqrt_price_x96, tick, "initialize");
        Ok(())
    }

    /// Adds `amount` liquidity to a position and returns the tokens the
    /// pool takes in, rounded up.
    pub fn mint(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<TokenAmounts, Error> {
        self.require_initialized("mint")?;
        if amount == 0 {
            return Err(PoolError::ZeroMintAmount.into());
        }
        let liquidity_delta = i128::try_from(amount).map_err(|_| MathError::Overflow)?;

        let plan = self.modify_position(owner, tick_lower, tick_upper, liquidity_delta)?;
        let amounts = TokenAmounts::new(plan.amount0.into_raw(), plan.amount1.into_raw());
        let token0_balance = self
            .token0_balance
            .checked_add(amounts.amount0)
            .ok_or(MathError::Overflow)?;
        let token1_balance = self
            .token1_balance
            .checked_add(amounts.amount1)
            .ok_or(MathError::Overflow)?;

        self.commit_modify(plan);
        self.token0_balance = token0_balance;
        self.token1_balance = token1_balance;

        debug!(
            %owner, tick_lower, tick_upper, amount,
            amount0 = %amounts.amount0, amount1 = %amounts.amount1,
            "mint"
        );
        Ok(amounts)
    }

    /// Removes `amount` liquidity and credits the released tokens, rounded
    /// down, to the position's owed balance. Burning zero only settles fees.
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<TokenAmounts, Error> {
        self.require_initialized("burn")?;
        // position liquidity is capped well below i128::MAX
        let Ok(liquidity_delta) = i128::try_from(amount).map(|a| -a) else {
            self.check_ticks(tick_lower, tick_upper)?;
            let key = PositionKey::new(owner, tick_lower, tick_upper);
            return Err(PoolError::InsufficientPositionLiquidity {
                owner,
                tick_lower,
                tick_upper,
                available: self.positions.get(&key).map_or(0, |p| p.liquidity),
                requested: amount,
            }
            .into());
        };

        let mut plan = self.modify_position(owner, tick_lower, tick_upper, liquidity_delta)?;
        let amounts = TokenAmounts::new(
            plan.amount0.unsigned_abs(),
            plan.amount1.unsigned_abs(),
        );
        plan.position.tokens_owed_0 = plan
            .position
            .tokens_owed_0
            .wrapping_add(low_u128(amounts.amount0));
        plan.position.tokens_owed_1 = plan
            .position
            .tokens_owed_1
            .wrapping_add(low_u128(amounts.amount1));

        self.commit_modify(plan);

        debug!(
            %owner, tick_lower, tick_upper, amount,
            amount0 = %amounts.amount0, amount1 = %amounts.amount1,
            "burn"
        );
        Ok(amounts)
    }

    /// Pays out owed tokens, each capped at what the position is owed.
    pub fn collect(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> Result<TokenAmounts, Error> {
        self.require_initialized("collect")?;
        let key = PositionKey::new(owner, tick_lower, tick_upper);

        let (amount0, amount1) =
            self.positions
                .collectable(&key, amount_0_requested, amount_1_requested);
        let token0_balance = self
            .token0_balance
            .checked_sub(U256::from(amount0))
            .ok_or(MathError::Underflow)?;
        let token1_balance = self
            .token1_balance
            .checked_sub(U256::from(amount1))
            .ok_or(MathError::Underflow)?;

        self.positions
            .collect(&key, amount_0_requested, amount_1_requested);
        self.token0_balance = token0_balance;
        self.token1_balance = token1_balance;

        debug!(%owner, tick_lower, tick_upper, amount0, amount1, "collect");
        Ok(TokenAmounts::new(U256::from(amount0), U256::from(amount1)))
    }

    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> Result<(), PoolError> {
        let reason = if tick_lower >= tick_upper {
            Some("tickLower must be below tickUpper")
        } else if tick_lower < MIN_TICK {
            Some("tickLower below MIN_TICK")
        } else if tick_upper > MAX_TICK {
            Some("tickUpper above MAX_TICK")
        } else if tick_lower % self.config.tick_spacing != 0
            || tick_upper % self.config.tick_spacing != 0
        {
            Some("ticks must be multiples of tickSpacing")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PoolError::InvalidRange {
                tick_lower,
                tick_upper,
                reason,
            }),
            None => Ok(()),
        }
    }

    // Evaluates a liquidity change without touching the pool.
    fn modify_position(
        &self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<ModifyPosition, Error> {
        self.check_ticks(tick_lower, tick_upper)?;

        let key = PositionKey::new(owner, tick_lower, tick_upper);
        let mut position = self.positions.get(&key).cloned().unwrap_or_default();

        if liquidity_delta == 0 && position.liquidity == 0 {
            return Err(PoolError::NoPosition {
                owner,
                tick_lower,
                tick_upper,
            }
            .into());
        }
        if liquidity_delta < 0 && position.liquidity < liquidity_delta.unsigned_abs() {
            return Err(PoolError::InsufficientPositionLiquidity {
                owner,
                tick_lower,
                tick_upper,
                available: position.liquidity,
                requested: liquidity_delta.unsigned_abs(),
            }
            .into());
        }

        let tick_current = self.slot0.tick;
        let current_lower = self.ticks.get(tick_lower).cloned().unwrap_or_default();
        let current_upper = self.ticks.get(tick_upper).cloned().unwrap_or_default();

        let (lower, upper) = if liquidity_delta != 0 {
            let max_liquidity = max_liquidity_per_tick(self.config.tick_spacing);
            let (lower, _) = current_lower.updated(
                tick_lower,
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                false,
                max_liquidity,
            )?;
            let (upper, _) = current_upper.updated(
                tick_upper,
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                true,
                max_liquidity,
            )?;
            (Some(lower), Some(upper))
        } else {
            (None, None)
        };

        let (fee_growth_inside_0_x128, fee_growth_inside_1_x128) = fee_growth_inside(
            lower.as_ref().unwrap_or(&current_lower),
            upper.as_ref().unwrap_or(&current_upper),
            tick_lower,
            tick_upper,
            tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );
        position.update(
            liquidity_delta,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
        )?;

        let mut amount0 = I256::ZERO;
        let mut amount1 = I256::ZERO;
        let mut liquidity = self.liquidity;

        if liquidity_delta != 0 {
            let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
            let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

            if tick_current < tick_lower {
                amount0 = get_amount_0_delta(sqrt_lower, sqrt_upper, liquidity_delta)?;
            } else if tick_current < tick_upper {
                amount0 =
                    get_amount_0_delta(self.slot0.sqrt_price_x96, sqrt_upper, liquidity_delta)?;
                amount1 =
                    get_amount_1_delta(sqrt_lower, self.slot0.sqrt_price_x96, liquidity_delta)?;
                liquidity = add_delta(liquidity, liquidity_delta)?;
            } else {
                amount1 = get_amount_1_delta(sqrt_lower, sqrt_upper, liquidity_delta)?;
            }
        }

        Ok(ModifyPosition {
            key,
            position,
            lower,
            upper,
            liquidity,
            amount0,
            amount1,
        })
    }

    fn commit_modify(&mut self, plan: ModifyPosition) {
        if let Some(lower) = plan.lower {
            self.ticks.set(plan.key.tick_lower, lower);
        }
        if let Some(upper) = plan.upper {
            self.ticks.set(plan.key.tick_upper, upper);
        }
        self.positions.set(plan.key, plan.position);
        self.liquidity = plan.liquidity;
    }
}
