mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::domain::StorePtr;
use std::sync::Arc;

/// Creates an in-memory store.
pub fn create_memory_store() -> StorePtr {
    Arc::new(MemoryStore::new())
}

/// Creates a Redis store for `url`. The connection itself is opened lazily.
pub fn create_redis_store(url: &str) -> anyhow::Result<StorePtr> {
    // ---
    tracing::info!("Using Redis record store");
    let client = redis::Client::open(url)?;
    Ok(Arc::new(RedisStore::new(client)))
}
