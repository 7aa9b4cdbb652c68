use crate::domain::KeyValueStore;
use anyhow::{Context, Result};
use redis::{AsyncCommands, Client};

/// Redis-backed key-value store. Values are stored as plain strings.
///
/// A multiplexed connection is opened per operation, so the store holds only
/// the client configuration and is safe to share between handlers.
pub struct RedisStore {
    // ---
    client: Client,
}

impl RedisStore {
    // ---
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        // ---
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    // ---
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // ---
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        // ---
        let mut conn = self.conn().await?;
        let _: String = conn.ping().await?;
        Ok(())
    }
}
