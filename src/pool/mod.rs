pub mod core_pool;
pub mod pool_config;
pub mod position;
pub mod swap;
pub mod tick;
