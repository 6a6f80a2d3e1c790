//! Feeding recorded pool events through a [`ConfigurableCorePool`].
//!
//! Events are consumed in `(block_number, log_index)` order; anything at or
//! behind the cursor is skipped, so each event applies at most once. The
//! amounts the simulation produces are checked against the recorded
//! ones. What happens on a difference is decided by [`ReplayPolicy`].

use crate::config::{ReplayConfig, ReplayPolicy};
use crate::error::{Error, ReplayError};
use crate::math::tick_math::{MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::pool::core_pool::CorePool;
use crate::pool::swap::SwapResult;
use crate::state::configurable::ConfigurableCorePool;
use crate::state::record::{inflow, outflow};
use alloy_primitives::{Address, I256, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Decoded pool log. Amounts are the ones emitted on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    Initialize {
        sqrt_price_x96: U256,
        tick: i32,
    },
    Mint {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        amount0: U256,
        amount1: U256,
    },
    Burn {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        amount0: U256,
        amount1: U256,
    },
    Collect {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0: u128,
        amount1: u128,
    },
    /// Amounts are signed from the pool's point of view; price, liquidity
    /// and tick are the pool's values after the swap.
    Swap {
        amount0: I256,
        amount1: I256,
        sqrt_price_x96: U256,
        liquidity: u128,
        tick: i32,
    },
}

impl EventAction {
    pub fn name(&self) -> &'static str {
        match self {
            EventAction::Initialize { .. } => "initialize",
            EventAction::Mint { .. } => "mint",
            EventAction::Burn { .. } => "burn",
            EventAction::Collect { .. } => "collect",
            EventAction::Swap { .. } => "swap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub action: EventAction,
}

impl PoolEvent {
    /// Chain position, the ordering and deduplication key.
    #[inline]
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Ordered supply of events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Up to `limit` events strictly after `after`, in chain order.
    async fn next_batch(
        &self,
        after: Option<(u64, u64)>,
        limit: usize,
    ) -> Result<Vec<PoolEvent>, ReplayError>;
}

#[derive(Debug, Clone, Default)]
pub struct VecEventSource {
    events: Vec<PoolEvent>,
}

impl VecEventSource {
    pub fn new(mut events: Vec<PoolEvent>) -> Self {
        events.sort_by_key(PoolEvent::position);
        Self { events }
    }
}

#[async_trait]
impl EventSource for VecEventSource {
    async fn next_batch(
        &self,
        after: Option<(u64, u64)>,
        limit: usize,
    ) -> Result<Vec<PoolEvent>, ReplayError> {
        let start = match after {
            Some(cursor) => self.events.partition_point(|e| e.position() <= cursor),
            None => 0,
        };
        Ok(self.events.iter().skip(start).take(limit).cloned().collect())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: u64,
    pub skipped: u64,
    pub mismatches: u64,
    pub snapshots: u64,
}

#[derive(Debug, Clone, Copy)]
struct SwapCall {
    zero_for_one: bool,
    amount_specified: I256,
    sqrt_price_limit_x96: Option<U256>,
}

#[derive(Debug, Clone, Copy)]
struct RecordedSwap {
    amount0: I256,
    amount1: I256,
    sqrt_price_x96: U256,
    liquidity: u128,
    tick: i32,
}

impl RecordedSwap {
    fn matches(&self, result: &SwapResult) -> bool {
        result.amount0 == self.amount0
            && result.amount1 == self.amount1
            && result.sqrt_price_x96 == self.sqrt_price_x96
            && result.tick == self.tick
            && result.liquidity == self.liquidity
    }

    /// Interpretations to try, in order: exact input then exact output,
    /// first unbounded, then stopped at the recorded price.
    fn candidates(&self, pool: &CorePool) -> Vec<SwapCall> {
        let zero_for_one =
            self.amount0.is_positive() || (self.amount0.is_zero() && self.amount1.is_negative());
        let (input, output) = if zero_for_one {
            (self.amount0, self.amount1)
        } else {
            (self.amount1, self.amount0)
        };

        let current = pool.sqrt_price_x96();
        let limit = Some(self.sqrt_price_x96).filter(|&price| {
            if zero_for_one {
                price < current && price > MIN_SQRT_RATIO
            } else {
                price > current && price < MAX_SQRT_RATIO
            }
        });

        let mut calls = Vec::with_capacity(4);
        let limits = match limit {
            Some(_) => vec![None, limit],
            None => vec![None],
        };
        for sqrt_price_limit_x96 in limits {
            for amount_specified in [input, output] {
                if !amount_specified.is_zero() {
                    calls.push(SwapCall {
                        zero_for_one,
                        amount_specified,
                        sqrt_price_limit_x96,
                    });
                }
            }
        }
        calls
    }
}

/// Applies events to a pool and keeps track of what has been applied.
#[derive(Debug)]
pub struct Replayer {
    pool: ConfigurableCorePool,
    policy: ReplayPolicy,
    batch_size: usize,
    snapshot_interval: Option<u64>,
    cursor: Option<(u64, u64)>,
    stats: ReplayStats,
}

impl Replayer {
    pub fn new(pool: ConfigurableCorePool, config: &ReplayConfig) -> Self {
        Self {
            pool,
            policy: config.policy,
            batch_size: config.batch_size.max(1),
            snapshot_interval: config.snapshot_interval.filter(|&n| n > 0),
            cursor: None,
            stats: ReplayStats::default(),
        }
    }

    #[inline]
    pub fn pool(&self) -> &ConfigurableCorePool {
        &self.pool
    }

    pub fn into_pool(self) -> ConfigurableCorePool {
        self.pool
    }

    #[inline]
    pub fn policy(&self) -> ReplayPolicy {
        self.policy
    }

    #[inline]
    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Position of the last event consumed.
    #[inline]
    pub fn cursor(&self) -> Option<(u64, u64)> {
        self.cursor
    }

    /// Pulls batches from `source` until it runs dry.
    pub async fn run<S>(&mut self, source: &S) -> Result<ReplayStats, Error>
    where
        S: EventSource + ?Sized,
    {
        loop {
            let batch = source.next_batch(self.cursor, self.batch_size).await?;
            if batch.is_empty() {
                break;
            }

            let before = self.cursor;
            for event in &batch {
                self.apply_event(event)?;
            }
            info!(
                events = batch.len(),
                cursor = ?self.cursor,
                applied = self.stats.applied,
                mismatches = self.stats.mismatches,
                "replayed batch"
            );
            if self.cursor == before {
                // source ignores the cursor
                break;
            }
        }
        Ok(self.stats)
    }

    /// Applies one event unless it is at or behind the cursor.
    pub fn apply_event(&mut self, event: &PoolEvent) -> Result<(), Error> {
        let position = event.position();
        if self.cursor.is_some_and(|cursor| position <= cursor) {
            debug!(block = event.block_number, log = event.log_index, "stale event skipped");
            self.stats.skipped += 1;
            return Ok(());
        }

        match event.action {
            EventAction::Initialize {
                sqrt_price_x96,
                tick,
            } => {
                self.pool.initialize(sqrt_price_x96)?;
                let actual = self.pool.core().tick_current();
                if actual != tick {
                    self.on_mismatch(
                        ReplayError::StateMismatch {
                            action: event.action.name(),
                            block_number: event.block_number,
                            log_index: event.log_index,
                            field: "tick",
                            expected: tick.to_string(),
                            actual: actual.to_string(),
                        },
                        true,
                    )?;
                }
            }
            EventAction::Mint {
                owner,
                tick_lower,
                tick_upper,
                amount,
                amount0,
                amount1,
            } => {
                let actual = inflow(self.pool.mint(owner, tick_lower, tick_upper, amount)?);
                let expected = (I256::from_raw(amount0), I256::from_raw(amount1));
                self.verify_amounts(event, expected, actual)?;
            }
            EventAction::Burn {
                owner,
                tick_lower,
                tick_upper,
                amount,
                amount0,
                amount1,
            } => {
                let actual = outflow(self.pool.burn(owner, tick_lower, tick_upper, amount)?);
                let expected = (-I256::from_raw(amount0), -I256::from_raw(amount1));
                self.verify_amounts(event, expected, actual)?;
            }
            EventAction::Collect {
                owner,
                tick_lower,
                tick_upper,
                amount0,
                amount1,
            } => {
                let actual =
                    outflow(self.pool.collect(owner, tick_lower, tick_upper, amount0, amount1)?);
                let expected = (
                    -I256::from_raw(U256::from(amount0)),
                    -I256::from_raw(U256::from(amount1)),
                );
                self.verify_amounts(event, expected, actual)?;
            }
            EventAction::Swap {
                amount0,
                amount1,
                sqrt_price_x96,
                liquidity,
                tick,
            } => {
                let recorded = RecordedSwap {
                    amount0,
                    amount1,
                    sqrt_price_x96,
                    liquidity,
                    tick,
                };
                self.replay_swap(event, &recorded)?;
            }
        }

        self.cursor = Some(position);
        self.stats.applied += 1;

        if let Some(interval) = self.snapshot_interval {
            if self.stats.applied % interval == 0 {
                let id = self.pool.take_snapshot(&format!(
                    "block {} log {}",
                    event.block_number, event.log_index
                ));
                debug!(snapshot = %id, "periodic snapshot");
                self.stats.snapshots += 1;
            }
        }
        Ok(())
    }

    fn verify_amounts(
        &mut self,
        event: &PoolEvent,
        expected: (I256, I256),
        actual: (I256, I256),
    ) -> Result<(), Error> {
        if expected == actual {
            return Ok(());
        }
        self.on_mismatch(amount_mismatch(event, expected, actual), true)
    }

    // Under the strict policy an already applied event is undone before the
    // error is returned.
    fn on_mismatch(&mut self, mismatch: ReplayError, applied: bool) -> Result<(), Error> {
        match self.policy {
            ReplayPolicy::Strict => {
                if applied {
                    self.pool.step_back()?;
                }
                Err(mismatch.into())
            }
            ReplayPolicy::Lenient => {
                warn!(%mismatch, "replay mismatch");
                self.stats.mismatches += 1;
                Ok(())
            }
        }
    }

    fn replay_swap(&mut self, event: &PoolEvent, recorded: &RecordedSwap) -> Result<(), Error> {
        let candidates = recorded.candidates(self.pool.core());

        let resolved = candidates.iter().find(|call| {
            self.pool
                .query_swap(call.zero_for_one, call.amount_specified, call.sqrt_price_limit_x96)
                .is_ok_and(|result| recorded.matches(&result))
        });
        if let Some(call) = resolved {
            self.pool
                .swap(call.zero_for_one, call.amount_specified, call.sqrt_price_limit_x96)?;
            return Ok(());
        }

        // exact input bounded by the recorded price, when there is one
        let Some(fallback) = candidates
            .iter()
            .rev()
            .find(|call| call.amount_specified.is_positive())
            .or(candidates.first())
            .copied()
        else {
            let mismatch = amount_mismatch(
                event,
                (recorded.amount0, recorded.amount1),
                (I256::ZERO, I256::ZERO),
            );
            return self.on_mismatch(mismatch, false);
        };

        let result = self.pool.query_swap(
            fallback.zero_for_one,
            fallback.amount_specified,
            fallback.sqrt_price_limit_x96,
        )?;
        let mismatch = swap_mismatch(event, recorded, &result);
        self.on_mismatch(mismatch, false)?;
        self.pool.swap(
            fallback.zero_for_one,
            fallback.amount_specified,
            fallback.sqrt_price_limit_x96,
        )?;
        Ok(())
    }
}

fn amount_mismatch(event: &PoolEvent, expected: (I256, I256), actual: (I256, I256)) -> ReplayError {
    ReplayError::Mismatch {
        action: event.action.name(),
        block_number: event.block_number,
        log_index: event.log_index,
        expected0: expected.0,
        expected1: expected.1,
        actual0: actual.0,
        actual1: actual.1,
    }
}

fn swap_mismatch(event: &PoolEvent, recorded: &RecordedSwap, result: &SwapResult) -> ReplayError {
    let expected = (recorded.amount0, recorded.amount1);
    let actual = (result.amount0, result.amount1);
    if expected != actual {
        return amount_mismatch(event, expected, actual);
    }

    let (field, expected, actual) = if result.sqrt_price_x96 != recorded.sqrt_price_x96 {
        (
            "sqrtPriceX96",
            recorded.sqrt_price_x96.to_string(),
            result.sqrt_price_x96.to_string(),
        )
    } else if result.tick != recorded.tick {
        ("tick", recorded.tick.to_string(), result.tick.to_string())
    } else {
        (
            "liquidity",
            recorded.liquidity.to_string(),
            result.liquidity.to_string(),
        )
    };
    ReplayError::StateMismatch {
        action: event.action.name(),
        block_number: event.block_number,
        log_index: event.log_index,
        field,
        expected,
        actual,
    }
}
