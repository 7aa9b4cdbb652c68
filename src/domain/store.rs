use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Abstraction for the string key-value backend behind the record store.
///
/// Values are opaque strings (JSON documents in practice). Implementations that
/// can observe writes from other contexts may publish the changed key through
/// [`KeyValueStore::subscribe`].
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    // ---
    /// Read the raw value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Delete `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Round-trip to the backend, used by the full health check.
    async fn ping(&self) -> Result<()>;

    /// Change notifications carrying the written key, when supported.
    fn subscribe(&self) -> Option<broadcast::Receiver<String>> {
        None
    }
}

/// Type alias for any backend that implements KeyValueStore.
pub type StorePtr = Arc<dyn KeyValueStore>;
