use crate::error::{Error, SnapshotError};
use crate::persistence::SnapshotStore;
use crate::pool::core_pool::{CorePool, TokenAmounts};
use crate::pool::pool_config::PoolConfig;
use crate::pool::swap::SwapResult;
use crate::state::pool_state::PoolState;
use crate::state::provider::{Clock, IdGenerator, SequentialIds, SystemClock};
use crate::state::record::{Action, Record, inflow, outflow};
use crate::state::snapshot::Snapshot;
use crate::state::visitor::PostProcessor;
use alloy_primitives::{Address, I256, U256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A [`CorePool`] that records every applied action and can branch,
/// undo and restore its history.
///
/// Every successful operation appends a [`Record`] and moves the pool to a
/// new immutable [`PoolState`]. Failed operations leave both the pool and
/// the history untouched.
pub struct ConfigurableCorePool {
    core: CorePool,
    state: Arc<PoolState>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    post_processor: Option<Arc<dyn PostProcessor>>,
}

impl fmt::Debug for ConfigurableCorePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableCorePool")
            .field("state", &self.state.id())
            .field("core", &self.core)
            .field("post_processor", &self.post_processor.is_some())
            .finish()
    }
}

impl ConfigurableCorePool {
    pub fn new(config: PoolConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(SequentialIds::default()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_providers(
        config: PoolConfig,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = Arc::new(PoolState::root(ids.next_id(), config));
        Self {
            core: CorePool::new(config),
            state,
            ids,
            clock,
            post_processor: None,
        }
    }

    /// Starts a history at `snapshot`, as if it had been recovered.
    pub fn from_snapshot(
        snapshot: Snapshot,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let snapshot = Arc::new(snapshot);
        Self {
            core: snapshot.pool.clone(),
            state: Arc::new(PoolState::recovered(ids.next_id(), snapshot)),
            ids,
            clock,
            post_processor: None,
        }
    }

    #[inline]
    pub fn core(&self) -> &CorePool {
        &self.core
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        self.core.config()
    }

    #[inline]
    pub fn state(&self) -> &Arc<PoolState> {
        &self.state
    }

    /// Id of the current state.
    #[inline]
    pub fn id(&self) -> &str {
        self.state.id()
    }

    /// Records from the start of the history (root or recovery point) up to
    /// the current state, oldest first.
    pub fn records(&self) -> Vec<&Record> {
        let mut records = Vec::new();
        let mut cursor: &PoolState = &self.state;
        while let Some(record) = cursor.record() {
            records.push(record);
            match cursor.source() {
                Some(source) => cursor = source,
                None => break,
            }
        }
        records.reverse();
        records
    }

    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<(), Error> {
        self.core.initialize(sqrt_price_x96)?;
        self.append(Action::Initialize { sqrt_price_x96 }, (I256::ZERO, I256::ZERO));
        Ok(())
    }

    pub fn mint(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<TokenAmounts, Error> {
        let amounts = self.core.mint(owner, tick_lower, tick_upper, amount)?;
        self.append(
            Action::Mint {
                owner,
                tick_lower,
                tick_upper,
                amount,
            },
            inflow(amounts),
        );
        Ok(amounts)
    }

    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<TokenAmounts, Error> {
        let amounts = self.core.burn(owner, tick_lower, tick_upper, amount)?;
        self.append(
            Action::Burn {
                owner,
                tick_lower,
                tick_upper,
                amount,
            },
            outflow(amounts),
        );
        Ok(amounts)
    }

    pub fn collect(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
    ) -> Result<TokenAmounts, Error> {
        let amounts = self.core.collect(
            owner,
            tick_lower,
            tick_upper,
            amount_0_requested,
            amount_1_requested,
        )?;
        self.append(
            Action::Collect {
                owner,
                tick_lower,
                tick_upper,
                amount_0_requested,
                amount_1_requested,
            },
            outflow(amounts),
        );
        Ok(amounts)
    }

    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        let result = self
            .core
            .swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;
        self.append(
            Action::Swap {
                zero_for_one,
                amount_specified,
                sqrt_price_limit_x96,
            },
            (result.amount0, result.amount1),
        );
        Ok(result)
    }

    /// Dry run; nothing is recorded.
    pub fn query_swap(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapResult, Error> {
        self.core
            .query_swap(zero_for_one, amount_specified, sqrt_price_limit_x96)
    }

    fn append(&mut self, action: Action, (amount0, amount1): (I256, I256)) {
        let record = Record {
            id: self.ids.next_id(),
            action,
            amount0,
            amount1,
            timestamp: self.clock.now_millis(),
        };
        debug!(
            source = self.state.id(),
            target = %record.id,
            action = record.action.name(),
            "transition"
        );
        self.state = Arc::new(PoolState::successor(self.state.clone(), record));
        self.notify();
    }

    fn notify(&self) {
        if let (Some(post_processor), Some(record)) = (&self.post_processor, self.state.record()) {
            post_processor.on_transition(&self.core, record);
        }
    }

    /// Materializes the current pool into the current state and returns the
    /// snapshot id. A state keeps the first snapshot taken of it; later calls
    /// return that id and ignore `description`.
    pub fn take_snapshot(&self, description: &str) -> String {
        self.current_snapshot(description).id.clone()
    }

    fn current_snapshot(&self, description: &str) -> Arc<Snapshot> {
        self.state.materialize(|| {
            Snapshot::new(
                self.ids.next_id(),
                description,
                self.clock.now_millis(),
                self.core.clone(),
            )
        })
    }

    /// Opens an independent branch at the current state. The branch starts
    /// from a snapshot of this state (taken implicitly when missing) and
    /// shares the id generator, clock and post-processor.
    pub fn fork(&self) -> Self {
        let base = self.current_snapshot("fork");
        let record = Record {
            id: self.ids.next_id(),
            action: Action::Fork {
                parent_id: self.state.id().to_string(),
            },
            amount0: I256::ZERO,
            amount1: I256::ZERO,
            timestamp: self.clock.now_millis(),
        };
        debug!(parent = self.state.id(), branch = %record.id, "fork");

        let branch = Self {
            core: base.pool.clone(),
            state: Arc::new(PoolState::forked(self.state.clone(), base, record)),
            ids: self.ids.clone(),
            clock: self.clock.clone(),
            post_processor: self.post_processor.clone(),
        };
        branch.notify();
        branch
    }

    /// Drops the latest transition and rebuilds the pool from the nearest
    /// materialized ancestor.
    pub fn step_back(&mut self) -> Result<(), Error> {
        let source = self
            .state
            .source()
            .cloned()
            .ok_or(SnapshotError::NoHistory)?;
        let core = source.rebuild()?;
        debug!(
            from = self.state.id(),
            to = source.id(),
            replayed = source.replay_depth(),
            "step back"
        );
        self.core = core;
        self.state = source;
        Ok(())
    }

    /// Replaces the pool and its history with a persisted snapshot.
    pub async fn recover<S>(&mut self, store: &S, snapshot_id: &str) -> Result<(), Error>
    where
        S: SnapshotStore + ?Sized,
    {
        let snapshot = store
            .get_snapshot(snapshot_id)
            .await?
            .ok_or_else(|| SnapshotError::NotFound {
                id: snapshot_id.to_string(),
            })?;
        self.recover_from_snapshot(snapshot)
    }

    pub fn recover_from_snapshot(&mut self, snapshot: Snapshot) -> Result<(), Error> {
        if snapshot.pool.config() != self.core.config() {
            return Err(SnapshotError::PoolMismatch {
                expected: self.core.config().pool_key(),
                found: snapshot.pool_key(),
            }
            .into());
        }
        debug!(snapshot = %snapshot.id, "recover");
        let snapshot = Arc::new(snapshot);
        self.core = snapshot.pool.clone();
        self.state = Arc::new(PoolState::recovered(self.ids.next_id(), snapshot));
        Ok(())
    }

    /// Snapshots the current state if needed and hands it to `store`.
    pub async fn persist_snapshot<S>(&self, store: &S) -> Result<String, Error>
    where
        S: SnapshotStore + ?Sized,
    {
        let snapshot = self.current_snapshot("persisted");
        Ok(store.persist_snapshot(&snapshot).await?)
    }

    /// Registers the observer called after every successful transition,
    /// replacing any previous one.
    pub fn update_post_processor<P>(&mut self, post_processor: P)
    where
        P: PostProcessor + 'static,
    {
        self.post_processor = Some(Arc::new(post_processor));
    }

    pub fn clear_post_processor(&mut self) {
        self.post_processor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Q96;
    use crate::error::PoolError;
    use crate::persistence::MemoryStore;
    use crate::pool::core_pool::tests::{config, owner};
    use crate::state::provider::ManualClock;
    use std::sync::Mutex;

    fn exact_in(amount: u64) -> I256 {
        I256::from_raw(U256::from(amount))
    }

    fn pool() -> ConfigurableCorePool {
        let mut pool = ConfigurableCorePool::with_providers(
            config(),
            Arc::new(SequentialIds::new("t")),
            Arc::new(ManualClock::new(1_000)),
        );
        pool.initialize(Q96).unwrap();
        pool.mint(owner(), -600, 600, 1_000_000_000_000_000_000)
            .unwrap();
        pool
    }

    #[test]
    fn operations_append_records() {
        let mut pool = pool();
        pool.swap(true, exact_in(1_000_000_000_000_000), None)
            .unwrap();

        let records = pool.records();
        let names: Vec<&str> = records.iter().map(|r| r.action.name()).collect();
        assert_eq!(names, ["initialize", "mint", "swap"]);
        assert_eq!(pool.id(), records[2].id);
        assert_eq!(records[1].amount0, I256::from_raw(U256::from(29553010879137170u64)));
        assert_eq!(records[2].amount0, exact_in(1_000_000_000_000_000));
        assert_eq!(records[2].amount1, -I256::from_raw(U256::from(996006981039903u64)));
        assert!(records.iter().all(|r| r.timestamp == 1_000));
    }

    #[test]
    fn failed_operations_leave_no_trace() {
        let mut pool = pool();
        let before = pool.core().clone();
        let id = pool.id().to_string();

        assert!(matches!(
            pool.burn(owner(), -600, 600, u128::MAX),
            Err(Error::PoolError(PoolError::InsufficientPositionLiquidity { .. }))
        ));
        assert!(pool.swap(true, I256::ZERO, None).is_err());
        assert_eq!(pool.core(), &before);
        assert_eq!(pool.id(), id);
        assert_eq!(pool.records().len(), 2);
    }

    #[test]
    fn fork_is_isolated() {
        let mut original = pool();
        let fork = original.fork();
        assert_eq!(fork.core(), original.core());
        assert_eq!(fork.state().source().unwrap().id(), original.id());
        assert!(fork.state().base_snapshot().is_some());

        original
            .swap(true, exact_in(1_000_000_000_000_000), None)
            .unwrap();
        assert_eq!(original.core().tick_current(), -20);
        assert_eq!(fork.core().tick_current(), 0);

        let mut fork = fork;
        fork.swap(false, exact_in(1_000_000_000_000_000), None)
            .unwrap();
        assert!(fork.core().tick_current() > 0);
        assert_eq!(original.core().tick_current(), -20);
    }

    #[test]
    fn step_back_restores_identical_pool() {
        let mut pool = pool();
        let after_mint = pool.core().clone();
        let mint_id = pool.id().to_string();

        pool.swap(true, exact_in(10_000_000_000_000_000), None)
            .unwrap();
        pool.burn(owner(), -600, 600, 500_000_000).unwrap();
        pool.step_back().unwrap();
        pool.step_back().unwrap();

        assert_eq!(pool.core(), &after_mint);
        assert_eq!(pool.id(), mint_id);
    }

    #[test]
    fn step_back_replays_from_snapshot() {
        let mut pool = pool();
        pool.take_snapshot("after mint");
        pool.swap(true, exact_in(1_000_000_000), None).unwrap();
        let after_first = pool.core().clone();
        pool.swap(false, exact_in(3_000_000_000), None).unwrap();

        pool.step_back().unwrap();
        assert_eq!(pool.state().replay_depth(), 1);
        assert_eq!(pool.core(), &after_first);
    }

    #[test]
    fn step_back_at_root_fails() {
        let mut pool = ConfigurableCorePool::new(config());
        assert_eq!(
            pool.step_back(),
            Err(Error::SnapshotError(SnapshotError::NoHistory))
        );
    }

    #[test]
    fn take_snapshot_is_write_once_per_state() {
        let mut pool = pool();
        let first = pool.take_snapshot("one");
        assert_eq!(pool.take_snapshot("two"), first);
        assert_eq!(pool.state().snapshot().unwrap().description, "one");

        pool.swap(true, exact_in(1_000), None).unwrap();
        assert_ne!(pool.take_snapshot("three"), first);
    }

    #[tokio::test]
    async fn recover_reproduces_persisted_pool() {
        let store = MemoryStore::new();
        let mut source = pool();
        source
            .swap(true, exact_in(10_000_000_000_000_000), None)
            .unwrap();
        let id = source.persist_snapshot(&store).await.unwrap();

        let mut fresh = ConfigurableCorePool::new(config());
        fresh.recover(&store, &id).await.unwrap();
        assert_eq!(fresh.core(), source.core());
        assert!(fresh.records().is_empty());
        assert!(fresh.step_back().is_err());

        // the recovered pool keeps working like the original
        let a = fresh.swap(false, exact_in(7_777), None).unwrap();
        let b = source.swap(false, exact_in(7_777), None).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn recover_unknown_snapshot_fails() {
        let store = MemoryStore::new();
        let mut pool = pool();
        let before = pool.core().clone();
        assert_eq!(
            pool.recover(&store, "nope").await,
            Err(Error::SnapshotError(SnapshotError::NotFound {
                id: "nope".into()
            }))
        );
        assert_eq!(pool.core(), &before);
    }

    #[test]
    fn recover_rejects_other_pools() {
        let other = PoolConfig::new(
            Address::with_last_byte(3),
            Address::with_last_byte(4),
            crate::FeeAmount::Low,
        );
        let snapshot = Snapshot::new("x", "", 0, CorePool::new(other));
        let mut pool = pool();
        assert!(matches!(
            pool.recover_from_snapshot(snapshot),
            Err(Error::SnapshotError(SnapshotError::PoolMismatch { .. }))
        ));
    }

    #[test]
    fn post_processor_sees_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut pool = pool();
        pool.update_post_processor(move |core: &CorePool, record: &Record| {
            sink.lock()
                .unwrap()
                .push((record.action.name(), core.tick_current()));
        });

        pool.swap(true, exact_in(1_000_000_000_000_000), None)
            .unwrap();
        let _ = pool.swap(true, I256::ZERO, None);
        let branch = pool.fork();
        pool.clear_post_processor();
        pool.swap(false, exact_in(1_000), None).unwrap();

        assert_eq!(*seen.lock().unwrap(), [("swap", -20), ("fork", -20)]);
        drop(branch);
    }
}
