pub mod geolocation;
pub mod metrics;
pub mod store;
pub mod wallet;

// Re-export the factory functions for easy access
pub use geolocation::create_http_position_source;
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use store::{create_memory_store, create_redis_store, MemoryStore};
pub use wallet::create_json_rpc_provider;
