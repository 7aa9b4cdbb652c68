//! Daily key issuing and validation.
//!
//! The key is a shared token shown to the class and typed back in at check-in.
//! It is issued and compared by this service alone, so anyone who learns it can
//! check in on anyone's behalf. It gates submission, it does not authenticate.

use crate::domain::StorePtr;
use crate::error::AttendanceError;
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::RwLock;

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 5;

/// How long one key stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    /// One key per issuer lifetime, whatever the calendar says.
    Session,
    /// One key per local calendar day, persisted so restarts keep it.
    Day,
}

impl FromStr for KeyScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(KeyScope::Session),
            "day" | "daily" => Ok(KeyScope::Day),
            other => Err(anyhow::anyhow!("unknown daily key scope: {other}")),
        }
    }
}

/// A token of the form `YYYYMMDD-XXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyKey {
    value: String,
    issued_on: NaiveDate,
}

impl DailyKey {
    // ---

    /// Generates a fresh key for `date` with a random suffix.
    pub fn generate(date: NaiveDate) -> Self {
        Self::generate_with(date, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(date: NaiveDate, rng: &mut R) -> Self {
        // ---
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();

        Self {
            value: format!("{}-{}", date.format("%Y%m%d"), suffix),
            issued_on: date,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn issued_on(&self) -> NaiveDate {
        self.issued_on
    }

    /// Exact, case-sensitive comparison. Input is not trimmed.
    pub fn validate(&self, input: &str) -> Result<(), AttendanceError> {
        // ---
        if input.is_empty() {
            return Err(AttendanceError::KeyMissing);
        }
        if input != self.value {
            return Err(AttendanceError::KeyMismatch);
        }
        Ok(())
    }
}

/// Hands out the current key according to its [`KeyScope`].
pub struct DailyKeyIssuer {
    // ---
    scope: KeyScope,
    store: StorePtr,
    current: RwLock<DailyKey>,
}

impl DailyKeyIssuer {
    // ---

    /// Issues the first key for `today`. In `Day` scope a key already persisted
    /// for that date is reused.
    pub async fn new(scope: KeyScope, store: StorePtr, today: NaiveDate) -> Self {
        // ---
        let first = match scope {
            KeyScope::Session => DailyKey::generate(today),
            KeyScope::Day => Self::load_or_issue(&store, today).await,
        };
        tracing::info!("Issued daily key for {} ({:?} scope)", first.issued_on, scope);

        Self {
            scope,
            store,
            current: RwLock::new(first),
        }
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    /// The key in force on `today`.
    pub async fn current(&self, today: NaiveDate) -> DailyKey {
        // ---
        if self.scope == KeyScope::Session {
            return self.current.read().await.clone();
        }

        {
            let key = self.current.read().await;
            if key.issued_on == today {
                return key.clone();
            }
        }

        let mut key = self.current.write().await;
        if key.issued_on != today {
            let expired = store_key(key.issued_on);
            *key = Self::load_or_issue(&self.store, today).await;
            tracing::info!("Rolled daily key over to {}", today);

            if let Err(e) = self.store.remove(&expired).await {
                tracing::error!("Error removing expired daily key {}: {:#}", expired, e);
            }
        }
        key.clone()
    }

    async fn load_or_issue(store: &StorePtr, today: NaiveDate) -> DailyKey {
        // ---
        let slot = store_key(today);

        match store.get(&slot).await {
            Ok(Some(raw)) => match serde_json::from_str::<DailyKey>(&raw) {
                Ok(key) if key.issued_on == today => return key,
                Ok(_) => tracing::warn!("Stored daily key under {} has the wrong date", slot),
                Err(e) => tracing::error!("Error parsing stored daily key {}: {}", slot, e),
            },
            Ok(None) => {}
            Err(e) => tracing::error!("Error reading stored daily key {}: {:#}", slot, e),
        }

        let key = DailyKey::generate(today);
        match serde_json::to_string(&key) {
            Ok(json) => {
                if let Err(e) = store.set(&slot, json).await {
                    tracing::error!("Error persisting daily key {}: {:#}", slot, e);
                }
            }
            Err(e) => tracing::error!("Error serializing daily key: {}", e),
        }
        key
    }
}

/// Store key under which the key for `date` is persisted in `Day` scope.
fn store_key(date: NaiveDate) -> String {
    format!("dailyKey:{}", date.format("%Y%m%d"))
}
