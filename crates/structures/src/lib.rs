mod handle_pool;

pub use handle_pool::{HandlePool, PoolHandle};
