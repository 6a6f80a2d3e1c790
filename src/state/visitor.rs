use crate::pool::core_pool::CorePool;
use crate::state::record::Record;
use tracing::info;

/// Observer invoked after every successful transition with the pool as it
/// stands afterwards.
pub trait PostProcessor: Send + Sync {
    fn on_transition(&self, pool: &CorePool, record: &Record);
}

impl<F> PostProcessor for F
where
    F: Fn(&CorePool, &Record) + Send + Sync,
{
    fn on_transition(&self, pool: &CorePool, record: &Record) {
        self(pool, record)
    }
}

/// Logs every transition at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleVisitor;

impl PostProcessor for ConsoleVisitor {
    fn on_transition(&self, pool: &CorePool, record: &Record) {
        info!(
            state = %record.id,
            action = record.action.name(),
            amount0 = %record.amount0,
            amount1 = %record.amount1,
            sqrt_price_x96 = %pool.sqrt_price_x96(),
            tick = pool.tick_current(),
            liquidity = pool.liquidity(),
            "transition"
        );
    }
}
