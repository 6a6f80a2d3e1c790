use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mod256_sub;
use alloy_primitives::U256;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Per-tick bookkeeping. A tick is initialized while any position
/// references it, i.e. while `liquidity_gross != 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
}

impl Tick {
    #[inline]
    pub fn initialized(&self) -> bool {
        self.liquidity_gross != 0
    }

    /// Returns this tick after applying `liquidity_delta` from the lower
    /// (`upper == false`) or upper bound of a position, together with a
    /// flag telling whether the initialized state flipped.
    ///
    /// A tick that becomes initialized at or below `tick_current` assumes
    /// all fee growth to date happened below it.
    #[allow(clippy::too_many_arguments)]
    pub fn updated(
        &self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<(Tick, bool), Error> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after = add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity {
            return Err(PoolError::TickLiquidityOverflow {
                tick,
                liquidity_gross: liquidity_gross_after,
                max: max_liquidity,
            }
            .into());
        }

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        let mut next = self.clone();
        if liquidity_gross_before == 0 && tick <= tick_current {
            next.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            next.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
        }
        next.liquidity_gross = liquidity_gross_after;
        next.liquidity_net = if upper {
            self.liquidity_net.checked_sub(liquidity_delta)
        } else {
            self.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(MathError::Overflow)?;

        Ok((next, flipped))
    }
}

/// Ordered set of initialized ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickIndex {
    ticks: BTreeMap<i32, Tick>,
}

impl TickIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, tick: i32) -> Option<&Tick> {
        self.ticks.get(&tick)
    }

    /// Returns the stored tick, creating a zeroed one if absent.
    pub fn get_or_init(&mut self, tick: i32) -> &mut Tick {
        self.ticks.entry(tick).or_default()
    }

    /// Stores `info` at `tick`; an uninitialized tick is removed instead.
    pub fn set(&mut self, tick: i32, info: Tick) {
        if info.initialized() {
            self.ticks.insert(tick, info);
        } else {
            self.ticks.remove(&tick);
        }
    }

    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// Flips the fee growth outside of `tick` and returns its net liquidity.
    pub fn cross(
        &mut self,
        tick: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> i128 {
        match self.ticks.get_mut(&tick) {
            Some(info) => {
                info.fee_growth_outside_0_x128 =
                    mod256_sub(fee_growth_global_0_x128, info.fee_growth_outside_0_x128);
                info.fee_growth_outside_1_x128 =
                    mod256_sub(fee_growth_global_1_x128, info.fee_growth_outside_1_x128);
                info.liquidity_net
            }
            None => 0,
        }
    }

    /// Fee growth per unit of liquidity accumulated strictly inside
    /// `[tick_lower, tick_upper)`, modulo 2^256.
    pub fn get_fee_growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> (U256, U256) {
        let zero = Tick::default();
        fee_growth_inside(
            self.ticks.get(&tick_lower).unwrap_or(&zero),
            self.ticks.get(&tick_upper).unwrap_or(&zero),
            tick_lower,
            tick_upper,
            tick_current,
            fee_growth_global_0_x128,
            fee_growth_global_1_x128,
        )
    }

    /// Next initialized tick within the 256-tick-spacing word that
    /// contains `tick`. When nothing is initialized before the word
    /// boundary, returns the boundary with `false`.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: i32,
        lte: bool,
    ) -> (i32, bool) {
        let compressed = compress(tick, tick_spacing);

        if lte {
            let word_pos = compressed >> 8;
            let minimum = (word_pos << 8) * tick_spacing;

            match self.ticks.range(minimum..=tick).next_back() {
                Some((next, _)) => (*next, true),
                None => (minimum, false),
            }
        } else {
            let word_pos = (compressed + 1) >> 8;
            let maximum = (((word_pos + 1) << 8) - 1) * tick_spacing;

            match self.ticks.range(tick + 1..=maximum).next() {
                Some((next, _)) => (*next, true),
                None => (maximum, false),
            }
        }
    }

    /// Sum of `liquidity_net` over every initialized tick. Zero for any
    /// consistent pool.
    pub fn liquidity_net_sum(&self) -> i128 {
        self.ticks.values().map(|t| t.liquidity_net).sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, i32, Tick> {
        self.ticks.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl FromIterator<(i32, Tick)> for TickIndex {
    fn from_iter<I: IntoIterator<Item = (i32, Tick)>>(iter: I) -> Self {
        let mut index = TickIndex::new();
        for (tick, info) in iter {
            index.set(tick, info);
        }
        index
    }
}

/// Floor division of `tick` by `tick_spacing`.
#[inline]
pub fn compress(tick: i32, tick_spacing: i32) -> i32 {
    let mut compressed = tick / tick_spacing;
    if tick < 0 && tick % tick_spacing != 0 {
        compressed -= 1;
    }
    compressed
}

/// Fee growth inside a range given its two bound ticks.
pub fn fee_growth_inside(
    lower: &Tick,
    upper: &Tick,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
) -> (U256, U256) {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (lower.fee_growth_outside_0_x128, lower.fee_growth_outside_1_x128)
    } else {
        (
            mod256_sub(fee_growth_global_0_x128, lower.fee_growth_outside_0_x128),
            mod256_sub(fee_growth_global_1_x128, lower.fee_growth_outside_1_x128),
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (upper.fee_growth_outside_0_x128, upper.fee_growth_outside_1_x128)
    } else {
        (
            mod256_sub(fee_growth_global_0_x128, upper.fee_growth_outside_0_x128),
            mod256_sub(fee_growth_global_1_x128, upper.fee_growth_outside_1_x128),
        )
    };

    (
        mod256_sub(mod256_sub(fee_growth_global_0_x128, below_0), above_0),
        mod256_sub(mod256_sub(fee_growth_global_1_x128, below_1), above_1),
    )
}
