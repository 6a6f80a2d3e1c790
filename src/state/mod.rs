pub mod configurable;
pub mod pool_state;
pub mod provider;
pub mod record;
pub mod snapshot;
pub mod visitor;
