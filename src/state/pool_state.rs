use crate::error::Error;
use crate::pool::core_pool::CorePool;
use crate::pool::pool_config::PoolConfig;
use crate::state::record::{Record, Transition};
use crate::state::snapshot::Snapshot;
use std::sync::{Arc, OnceLock};

/// Node of the history tree. Never mutated after creation except for the
/// write-once snapshot cell.
#[derive(Debug)]
pub struct PoolState {
    id: String,
    config: PoolConfig,
    source: Option<Arc<PoolState>>,
    transition: Option<Transition>,
    base_snapshot: Option<Arc<Snapshot>>,
    snapshot: OnceLock<Arc<Snapshot>>,
}

impl PoolState {
    pub(crate) fn root(id: String, config: PoolConfig) -> Self {
        Self {
            id,
            config,
            source: None,
            transition: None,
            base_snapshot: None,
            snapshot: OnceLock::new(),
        }
    }

    /// State rebuilt from a persisted snapshot; it has no history.
    pub(crate) fn recovered(id: String, snapshot: Arc<Snapshot>) -> Self {
        Self {
            id,
            config: *snapshot.pool.config(),
            source: None,
            transition: None,
            base_snapshot: Some(snapshot),
            snapshot: OnceLock::new(),
        }
    }

    /// State produced by applying `record` to `source`.
    pub(crate) fn successor(source: Arc<PoolState>, record: Record) -> Self {
        Self {
            id: record.id.clone(),
            config: source.config,
            transition: Some(Transition {
                source_id: source.id.clone(),
                record,
            }),
            source: Some(source),
            base_snapshot: None,
            snapshot: OnceLock::new(),
        }
    }

    /// First state of a branch, materialized from the parent's snapshot.
    pub(crate) fn forked(source: Arc<PoolState>, base: Arc<Snapshot>, record: Record) -> Self {
        let mut state = Self::successor(source, record);
        state.base_snapshot = Some(base);
        state
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&Arc<PoolState>> {
        self.source.as_ref()
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn record(&self) -> Option<&Record> {
        self.transition.as_ref().map(|t| &t.record)
    }

    /// Snapshot taken at this state, if any.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.get()
    }

    /// Snapshot this state was recovered or forked from.
    pub fn base_snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.base_snapshot.as_ref()
    }

    /// Stores `snapshot` unless one is already present, and returns the one
    /// the state ends up holding.
    pub(crate) fn materialize(&self, snapshot: impl FnOnce() -> Snapshot) -> Arc<Snapshot> {
        self.snapshot
            .get_or_init(|| Arc::new(snapshot()))
            .clone()
    }

    fn materialized(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.get().or(self.base_snapshot.as_ref())
    }

    /// Number of records that have to be replayed to rebuild this state.
    pub fn replay_depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self;
        while cursor.materialized().is_none() {
            match cursor.source.as_deref() {
                Some(source) => {
                    depth += 1;
                    cursor = source;
                }
                None => break,
            }
        }
        depth
    }

    /// Rebuilds the pool at this state by replaying records on top of the
    /// nearest materialized ancestor, or on an empty pool.
    pub fn rebuild(&self) -> Result<CorePool, Error> {
        let mut records: Vec<&Record> = Vec::new();
        let mut cursor = self;

        let mut pool = loop {
            if let Some(snapshot) = cursor.materialized() {
                break snapshot.pool.clone();
            }
            match (cursor.transition.as_ref(), cursor.source.as_deref()) {
                (Some(transition), Some(source)) => {
                    records.push(&transition.record);
                    cursor = source;
                }
                _ => break CorePool::new(cursor.config),
            }
        };

        for record in records.iter().rev() {
            record.action.apply(&mut pool)?;
        }
        Ok(pool)
    }
}

// unlink long histories iteratively instead of recursing through every Arc
impl Drop for PoolState {
    fn drop(&mut self) {
        let mut next = self.source.take();
        while let Some(state) = next {
            match Arc::try_unwrap(state) {
                Ok(mut inner) => next = inner.source.take(),
                Err(_) => break,
            }
        }
    }
}
