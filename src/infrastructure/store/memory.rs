use crate::domain::KeyValueStore;
use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

/// Process-local key-value store.
///
/// Every write is announced on a broadcast channel so that other readers of the
/// same key can refresh, the way browser tabs of one origin see each other's
/// storage writes.
pub struct MemoryStore {
    // ---
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        // ---
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn announce(&self, key: &str) {
        // No receivers is fine.
        let _ = self.changes.send(key.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    // ---
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        // ---
        self.entries.write().await.insert(key.to_string(), value);
        self.announce(key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        // ---
        if self.entries.write().await.remove(key).is_some() {
            self.announce(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.changes.subscribe())
    }
}
