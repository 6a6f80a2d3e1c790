use crate::error::SnapshotError;
use crate::math::tick_math::{MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use crate::pool::core_pool::CorePool;
use crate::pool::pool_config::PoolConfig;
use crate::pool::position::{Position, PositionIndex, PositionKey};
use crate::pool::swap::Slot0;
use crate::pool::tick::{Tick, TickIndex};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Materialized copy of a pool at one point of its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub description: String,
    pub timestamp: u64,
    pub pool: CorePool,
}

impl Snapshot {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        timestamp: u64,
        pool: CorePool,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            timestamp,
            pool,
        }
    }

    /// True when both snapshots describe the same pool state, whatever
    /// their id, description and timestamp.
    pub fn same_content(&self, other: &Snapshot) -> bool {
        self.pool == other.pool
    }

    pub fn pool_key(&self) -> String {
        self.pool.config().pool_key()
    }

    pub fn to_document(&self) -> SnapshotDocument {
        let pool = &self.pool;
        let config = pool.config();

        SnapshotDocument {
            id: self.id.clone(),
            description: self.description.clone(),
            timestamp: self.timestamp,
            pool_key: config.pool_key(),
            token0: config.token0.to_string(),
            token1: config.token1.to_string(),
            fee_pips: config.fee_pips,
            tick_spacing: config.tick_spacing,
            token0_balance: pool.token0_balance.to_string(),
            token1_balance: pool.token1_balance.to_string(),
            sqrt_price_x96: pool.slot0.sqrt_price_x96.to_string(),
            tick_current: pool.slot0.tick,
            liquidity: pool.liquidity.to_string(),
            fee_growth_global0_x128: pool.fee_growth_global_0_x128.to_string(),
            fee_growth_global1_x128: pool.fee_growth_global_1_x128.to_string(),
            ticks: pool
                .ticks
                .iter()
                .map(|(index, tick)| {
                    (
                        *index,
                        TickDocument {
                            liquidity_gross: tick.liquidity_gross.to_string(),
                            liquidity_net: tick.liquidity_net.to_string(),
                            fee_growth_outside0_x128: tick.fee_growth_outside_0_x128.to_string(),
                            fee_growth_outside1_x128: tick.fee_growth_outside_1_x128.to_string(),
                        },
                    )
                })
                .collect(),
            positions: pool
                .positions
                .iter()
                .map(|(key, position)| {
                    (
                        key.to_string(),
                        PositionDocument {
                            liquidity: position.liquidity.to_string(),
                            fee_growth_inside0_last_x128: position
                                .fee_growth_inside_0_last_x128
                                .to_string(),
                            fee_growth_inside1_last_x128: position
                                .fee_growth_inside_1_last_x128
                                .to_string(),
                            tokens_owed0: position.tokens_owed_0.to_string(),
                            tokens_owed1: position.tokens_owed_1.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn from_document(document: &SnapshotDocument) -> Result<Self, SnapshotError> {
        let token0 = parse_address("token0", &document.token0)?;
        let token1 = parse_address("token1", &document.token1)?;
        let config = PoolConfig::with_spacing(
            token0,
            token1,
            document.fee_pips,
            document.tick_spacing,
        )
        .map_err(|e| decode("config", e.to_string()))?;
        if config.token0 != token0 {
            return Err(decode("token0", &document.token0));
        }
        if config.pool_key() != document.pool_key {
            return Err(SnapshotError::PoolMismatch {
                expected: document.pool_key.clone(),
                found: config.pool_key(),
            });
        }

        let sqrt_price_x96 = parse_u256("sqrtPriceX96", &document.sqrt_price_x96)?;
        if !sqrt_price_x96.is_zero()
            && !(MIN_SQRT_RATIO..MAX_SQRT_RATIO).contains(&sqrt_price_x96)
        {
            return Err(decode("sqrtPriceX96", &document.sqrt_price_x96));
        }
        if !(MIN_TICK..=MAX_TICK).contains(&document.tick_current) {
            return Err(decode("tickCurrent", document.tick_current.to_string()));
        }

        let mut ticks = TickIndex::new();
        for (index, tick) in &document.ticks {
            if !(MIN_TICK..=MAX_TICK).contains(index) {
                return Err(decode("ticks", index.to_string()));
            }
            let tick = Tick {
                liquidity_gross: parse_num("liquidityGross", &tick.liquidity_gross)?,
                liquidity_net: parse_num("liquidityNet", &tick.liquidity_net)?,
                fee_growth_outside_0_x128: parse_u256(
                    "feeGrowthOutside0X128",
                    &tick.fee_growth_outside0_x128,
                )?,
                fee_growth_outside_1_x128: parse_u256(
                    "feeGrowthOutside1X128",
                    &tick.fee_growth_outside1_x128,
                )?,
            };
            if !tick.initialized() {
                return Err(decode("liquidityGross", index.to_string()));
            }
            ticks.set(*index, tick);
        }

        let mut positions = PositionIndex::new();
        for (key, position) in &document.positions {
            let key = parse_position_key(key)?;
            let position = Position {
                liquidity: parse_num("liquidity", &position.liquidity)?,
                fee_growth_inside_0_last_x128: parse_u256(
                    "feeGrowthInside0LastX128",
                    &position.fee_growth_inside0_last_x128,
                )?,
                fee_growth_inside_1_last_x128: parse_u256(
                    "feeGrowthInside1LastX128",
                    &position.fee_growth_inside1_last_x128,
                )?,
                tokens_owed_0: parse_num("tokensOwed0", &position.tokens_owed0)?,
                tokens_owed_1: parse_num("tokensOwed1", &position.tokens_owed1)?,
            };
            positions.set(key, position);
        }

        let pool = CorePool {
            config,
            token0_balance: parse_u256("token0Balance", &document.token0_balance)?,
            token1_balance: parse_u256("token1Balance", &document.token1_balance)?,
            slot0: Slot0 {
                sqrt_price_x96,
                tick: document.tick_current,
            },
            liquidity: parse_num("liquidity", &document.liquidity)?,
            fee_growth_global_0_x128: parse_u256(
                "feeGrowthGlobal0X128",
                &document.fee_growth_global0_x128,
            )?,
            fee_growth_global_1_x128: parse_u256(
                "feeGrowthGlobal1X128",
                &document.fee_growth_global1_x128,
            )?,
            ticks,
            positions,
        };

        Ok(Snapshot {
            id: document.id.clone(),
            description: document.description.clone(),
            timestamp: document.timestamp,
            pool,
        })
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(&self.to_document())
            .map_err(|e| SnapshotError::Store(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let document: SnapshotDocument =
            serde_json::from_str(json).map_err(|e| decode("document", e.to_string()))?;
        Self::from_document(&document)
    }
}

/// Persisted form of a [`Snapshot`]. Every big integer is a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub id: String,
    pub description: String,
    pub timestamp: u64,
    pub pool_key: String,
    pub token0: String,
    pub token1: String,
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub token0_balance: String,
    pub token1_balance: String,
    pub sqrt_price_x96: String,
    pub tick_current: i32,
    pub liquidity: String,
    pub fee_growth_global0_x128: String,
    pub fee_growth_global1_x128: String,
    pub ticks: BTreeMap<i32, TickDocument>,
    /// Keyed by `owner:tickLower:tickUpper`.
    pub positions: BTreeMap<String, PositionDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickDocument {
    pub liquidity_gross: String,
    pub liquidity_net: String,
    pub fee_growth_outside0_x128: String,
    pub fee_growth_outside1_x128: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDocument {
    pub liquidity: String,
    pub fee_growth_inside0_last_x128: String,
    pub fee_growth_inside1_last_x128: String,
    pub tokens_owed0: String,
    pub tokens_owed1: String,
}

fn decode(field: &'static str, value: impl Into<String>) -> SnapshotError {
    SnapshotError::Decode {
        field,
        value: value.into(),
    }
}

fn parse_u256(field: &'static str, value: &str) -> Result<U256, SnapshotError> {
    U256::from_str_radix(value, 10).map_err(|_| decode(field, value))
}

fn parse_num<T: FromStr>(field: &'static str, value: &str) -> Result<T, SnapshotError> {
    value.parse::<T>().map_err(|_| decode(field, value))
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, SnapshotError> {
    Address::from_str(value).map_err(|_| decode(field, value))
}

fn parse_position_key(value: &str) -> Result<PositionKey, SnapshotError> {
    let mut parts = value.rsplitn(3, ':');
    let (Some(upper), Some(lower), Some(owner)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(decode("positions", value));
    };
    let key = PositionKey::new(
        parse_address("positions", owner)?,
        parse_num("positions", lower)?,
        parse_num("positions", upper)?,
    );
    if key.tick_lower >= key.tick_upper {
        return Err(decode("positions", value));
    }
    Ok(key)
}
