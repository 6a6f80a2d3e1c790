use alloy_primitives::{Address, I256, U256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - out of bounds")]
    OutOfBounds,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool error - {operation} called before initialize")]
    NotInitialized { operation: &'static str },

    #[error("Pool error - pool already initialized at sqrtPriceX96 {sqrt_price_x96}")]
    AlreadyInitialized { sqrt_price_x96: U256 },

    #[error("Pool error - invalid range [{tick_lower}, {tick_upper}]: {reason}")]
    InvalidRange {
        tick_lower: i32,
        tick_upper: i32,
        reason: &'static str,
    },

    #[error("Pool error - invalid pool config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("Pool error - mint amount must be greater than 0")]
    ZeroMintAmount,

    #[error("Pool error - tick {tick} liquidityGross {liquidity_gross} exceeds max {max}")]
    TickLiquidityOverflow {
        tick: i32,
        liquidity_gross: u128,
        max: u128,
    },

    #[error(
        "Pool error - position {owner}:[{tick_lower}, {tick_upper}] holds {available} liquidity, requested {requested}"
    )]
    InsufficientPositionLiquidity {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        available: u128,
        requested: u128,
    },

    #[error("Pool error - no position with liquidity for {owner}:[{tick_lower}, {tick_upper}]")]
    NoPosition {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
    },

    #[error("Pool error - amountSpecified is 0")]
    AmountSpecifiedIsZero,

    #[error("Pool error - sqrtPriceLimit {limit} invalid for current sqrtPrice {current} (zeroForOne = {zero_for_one})")]
    InvalidPriceLimit {
        zero_for_one: bool,
        limit: U256,
        current: U256,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot error - snapshot {id} not found")]
    NotFound { id: String },

    #[error("Snapshot error - cannot decode {field} from {value:?}")]
    Decode { field: &'static str, value: String },

    #[error("Snapshot error - snapshot belongs to pool {found}, expected {expected}")]
    PoolMismatch { expected: String, found: String },

    #[error("Snapshot error - no previous state to step back to")]
    NoHistory,

    #[error("Snapshot error - store failure: {0}")]
    Store(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error(
        "Replay error - {action} at block {block_number} log {log_index}: expected ({expected0}, {expected1}), simulated ({actual0}, {actual1})"
    )]
    Mismatch {
        action: &'static str,
        block_number: u64,
        log_index: u64,
        expected0: I256,
        expected1: I256,
        actual0: I256,
        actual1: I256,
    },

    #[error(
        "Replay error - {action} at block {block_number} log {log_index}: recorded {field} {expected}, simulated {actual}"
    )]
    StateMismatch {
        action: &'static str,
        block_number: u64,
        log_index: u64,
        field: &'static str,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config error - cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Config error - {0}")]
    Parse(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] MathError),

    #[error(transparent)]
    StateError(#[from] StateError),

    #[error(transparent)]
    PoolError(#[from] PoolError),

    #[error(transparent)]
    SnapshotError(#[from] SnapshotError),

    #[error(transparent)]
    ReplayError(#[from] ReplayError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),
}

impl Error {
    /// Errors that indicate a logic defect rather than bad input.
    pub fn is_arithmetic_bound(&self) -> bool {
        matches!(self, Error::MathError(_))
    }
}
