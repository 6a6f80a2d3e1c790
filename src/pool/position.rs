use crate::Q128;
use crate::error::Error;
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::{low_u128, mod256_sub, mul_div};
use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Identifies a position by owner and tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    #[inline]
    pub fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.owner, self.tick_lower, self.tick_upper)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

impl Position {
    /// Credits fees earned since the last update using the liquidity held
    /// over that period, then applies `liquidity_delta`. Nothing is
    /// written unless every step succeeds.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        let liquidity_next = add_delta(self.liquidity, liquidity_delta)?;
        let liquidity = U256::from(self.liquidity);

        // owed amounts are truncated to uint128 and accumulate with wraparound
        let owed_0 = low_u128(mul_div(
            mod256_sub(fee_growth_inside_0_x128, self.fee_growth_inside_0_last_x128),
            liquidity,
            Q128,
        )?);
        let owed_1 = low_u128(mul_div(
            mod256_sub(fee_growth_inside_1_x128, self.fee_growth_inside_1_last_x128),
            liquidity,
            Q128,
        )?);

        self.liquidity = liquidity_next;
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;
        self.tokens_owed_0 = self.tokens_owed_0.wrapping_add(owed_0);
        self.tokens_owed_1 = self.tokens_owed_1.wrapping_add(owed_1);
        Ok(())
    }

    /// No liquidity and nothing left to collect.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed_0 == 0 && self.tokens_owed_1 == 0
    }
}

/// Positions ordered by key. Empty positions are not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    positions: BTreeMap<PositionKey, Position>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Returns the stored position, creating an empty one if absent.
    pub fn get_or_init(&mut self, key: PositionKey) -> &mut Position {
        self.positions.entry(key).or_default()
    }

    /// Stores `position` at `key`, dropping it when empty.
    pub fn set(&mut self, key: PositionKey, position: Position) {
        if position.is_empty() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
    }

    /// Amounts a `collect` would pay out: each request capped at what is owed.
    pub fn collectable(
        &self,
        key: &PositionKey,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> (u128, u128) {
        match self.positions.get(key) {
            Some(position) => (
                amount_0_requested.min(position.tokens_owed_0),
                amount_1_requested.min(position.tokens_owed_1),
            ),
            None => (0, 0),
        }
    }

    /// Pays out owed tokens up to the requested amounts and returns what
    /// was paid.
    pub fn collect(
        &mut self,
        key: &PositionKey,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> (u128, u128) {
        let (amount0, amount1) = self.collectable(key, amount_0_requested, amount_1_requested);
        if let Some(position) = self.positions.get_mut(key) {
            position.tokens_owed_0 -= amount0;
            position.tokens_owed_1 -= amount1;
            if position.is_empty() {
                self.positions.remove(key);
            }
        }
        (amount0, amount1)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PositionKey, Position> {
        self.positions.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<(PositionKey, Position)> for PositionIndex {
    fn from_iter<I: IntoIterator<Item = (PositionKey, Position)>>(iter: I) -> Self {
        let mut index = PositionIndex::new();
        for (key, position) in iter {
            index.set(key, position);
        }
        index
    }
}
