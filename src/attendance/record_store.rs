//! Typed, cached view of one key in a [`KeyValueStore`].
//!
//! A `LocalStore<T>` holds the current value in memory and writes the whole value
//! through to the backend as JSON on every change. Reads on load fall back to a
//! caller-supplied default when the key is absent or unparseable. A backend
//! failure never reaches the caller: it is logged and the store keeps working
//! from memory for the rest of the process.

use crate::domain::{KeyValueStore, StorePtr};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Store key holding the attendance collection.
pub const ATTENDANCE_RECORDS_KEY: &str = "attendanceRecords";

/// Store key holding the last connected wallet address.
pub const WALLET_ADDRESS_KEY: &str = "userWalletAddress";

pub struct LocalStore<T> {
    // ---
    key: String,
    backend: StorePtr,
    cache: RwLock<T>,
    degraded: AtomicBool,
}

impl<T> LocalStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // ---

    /// Loads `key` from the backend, falling back to `default`.
    pub async fn load(backend: StorePtr, key: impl Into<String>, default: T) -> Self {
        // ---
        let key = key.into();
        let store = Self {
            key,
            backend,
            cache: RwLock::new(default),
            degraded: AtomicBool::new(false),
        };

        if let Some(value) = store.read_backend().await {
            *store.cache.write().await = value;
        }
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True once a backend failure has switched this store to memory only.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Current value.
    pub async fn get(&self) -> T {
        self.cache.read().await.clone()
    }

    /// Replaces the value and persists it.
    pub async fn set(&self, value: T) {
        // ---
        let mut cache = self.cache.write().await;
        *cache = value;
        self.persist(&cache).await;
    }

    /// Read-modify-write of the whole value.
    ///
    /// Holds the write lock across the backend round-trip, so concurrent updates
    /// apply in completion order and none are lost. The latest backend value is
    /// used as the base when it can be read, so writers in other processes are
    /// not clobbered.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // ---
        let mut cache = self.cache.write().await;
        if let Some(latest) = self.read_backend().await {
            *cache = latest;
        }
        let result = f(&mut cache);
        self.persist(&cache).await;
        result
    }

    /// Re-reads the backend, keeping the cached value if nothing usable is there.
    pub async fn refresh(&self) {
        // ---
        if let Some(value) = self.read_backend().await {
            *self.cache.write().await = value;
        }
    }

    /// Follows backend change notifications for this key, if the backend has them.
    pub fn watch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        // ---
        let mut changes = self.backend.subscribe()?;
        let store = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            loop {
                let changed = match changes.recv().await {
                    Ok(key) => key,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let Some(strong) = store.upgrade() else { break };
                if changed == strong.key {
                    strong.refresh().await;
                }
            }
        }))
    }

    async fn read_backend(&self) -> Option<T> {
        // ---
        if self.is_degraded() {
            return None;
        }

        let raw = match self.backend.get(&self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("Error reading store key \"{}\": {:#}", self.key, e);
                self.degrade();
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Error parsing store key \"{}\": {}", self.key, e);
                None
            }
        }
    }

    async fn persist(&self, value: &T) {
        // ---
        if self.is_degraded() {
            return;
        }

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error serializing store key \"{}\": {}", self.key, e);
                return;
            }
        };

        if let Err(e) = self.backend.set(&self.key, json).await {
            tracing::error!("Error setting store key \"{}\": {:#}", self.key, e);
            self.degrade();
        }
    }

    fn degrade(&self) {
        // ---
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Store key \"{}\" degraded to in-memory operation for this session",
                self.key
            );
        }
    }
}
