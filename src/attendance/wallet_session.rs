//! Wallet connection state.
//!
//! A [`WalletSession`] owns the connection to one wallet provider: the active
//! account, its balance and the single event subscription that keeps them in
//! sync. The subscription is set up on the first successful connect and torn
//! down exactly once: on `disconnect()`, when the session is dropped, or when the
//! provider itself reports a disconnect or an empty account list.
//!
//! Every change of the active account, including the session ending, is
//! published on a `watch` channel; see [`WalletSession::watch_account`].

use crate::domain::{ProviderEvent, WalletProvider, WalletProviderPtr};
use crate::error::AttendanceError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

const WEI_PER_UNIT: u128 = 100_000_000_000_000; // 1e14 wei = 0.0001 ether

/// Formats a wei amount as ether with 4 decimal places, rounding half up.
pub fn format_ether(wei: u128) -> String {
    // ---
    let units = wei.saturating_add(WEI_PER_UNIT / 2) / WEI_PER_UNIT;
    format!("{}.{:04}", units / 10_000, units % 10_000)
}

/// Snapshot of the session as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatus {
    pub account: Option<String>,
    pub balance: Option<String>,
    pub chain_id: Option<String>,
    pub balance_error: Option<String>,
}

pub struct WalletSession {
    // ---
    provider: Option<WalletProviderPtr>,
    state: Arc<RwLock<WalletStatus>>,
    account_tx: Arc<watch::Sender<Option<String>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    connecting: AtomicBool,
}

/// Clears the `connecting` flag even if the connect future is dropped.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WalletSession {
    // ---

    /// A session over `provider`. `None` models a device with no wallet installed.
    pub fn new(provider: Option<WalletProviderPtr>) -> Self {
        // ---
        Self {
            provider,
            state: Arc::new(RwLock::new(WalletStatus::default())),
            account_tx: Arc::new(watch::channel(None).0),
            listener: Mutex::new(None),
            connecting: AtomicBool::new(false),
        }
    }

    pub async fn status(&self) -> WalletStatus {
        self.state.read().await.clone()
    }

    pub async fn account(&self) -> Option<String> {
        self.state.read().await.account.clone()
    }

    /// Follows the active account. The initial value is not reported as a change.
    pub fn watch_account(&self) -> watch::Receiver<Option<String>> {
        self.account_tx.subscribe()
    }

    /// True while the provider event subscription is live.
    pub fn is_listening(&self) -> bool {
        // ---
        self.listener
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Requests account authorization and returns the first authorized address.
    pub async fn connect(&self) -> Result<String, AttendanceError> {
        // ---
        let Some(provider) = self.provider.clone() else {
            tracing::warn!("Wallet connect requested but no wallet provider is configured");
            return Err(AttendanceError::WalletNotFound);
        };

        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(AttendanceError::WalletRequestPending);
        }
        let _guard = ConnectingGuard(&self.connecting);

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!("Error connecting wallet: {}", e);
                *self.state.write().await = WalletStatus::default();
                publish_account(&self.account_tx, None);
                return Err(e);
            }
        };

        let Some(account) = accounts.into_iter().next() else {
            *self.state.write().await = WalletStatus::default();
            publish_account(&self.account_tx, None);
            return Err(AttendanceError::WalletNoAccounts);
        };

        let chain_id = provider
            .chain_id()
            .await
            .map_err(|e| tracing::warn!("Could not read chain id: {}", e))
            .ok();

        {
            let mut state = self.state.write().await;
            state.account = Some(account.clone());
            state.chain_id = chain_id;
        }
        publish_account(&self.account_tx, Some(account.clone()));
        refresh_balance(provider.as_ref(), &self.state).await;
        self.ensure_listener(&provider);

        tracing::info!("Wallet connected: {}", account);
        Ok(account)
    }

    /// Clears the session and drops the provider subscription.
    pub async fn disconnect(&self) {
        // ---
        tracing::info!("Disconnecting wallet...");
        *self.state.write().await = WalletStatus::default();
        publish_account(&self.account_tx, None);
        self.stop_listener();
    }

    /// Re-fetches the balance of the active account.
    pub async fn refresh_balance(&self) -> WalletStatus {
        // ---
        if let Some(provider) = &self.provider {
            refresh_balance(provider.as_ref(), &self.state).await;
        }
        self.status().await
    }

    fn ensure_listener(&self, provider: &WalletProviderPtr) {
        // ---
        let Ok(mut slot) = self.listener.lock() else {
            return;
        };
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let mut events = provider.subscribe();
        let provider = provider.clone();
        let state = self.state.clone();
        let account_tx = self.account_tx.clone();

        *slot = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("Wallet listener skipped {} provider events", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !apply_event(provider.as_ref(), &state, &account_tx, event).await {
                    break;
                }
            }
            tracing::debug!("Wallet listener stopped");
        }));
    }

    fn stop_listener(&self) {
        // ---
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

/// Applies one provider event. Returns false when the session has ended.
async fn apply_event(
    provider: &dyn WalletProvider,
    state: &RwLock<WalletStatus>,
    account_tx: &watch::Sender<Option<String>>,
    event: ProviderEvent,
) -> bool {
    // ---
    let live = match event {
        ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
            None => {
                tracing::info!("Wallet disconnected: no accounts found or wallet locked");
                *state.write().await = WalletStatus::default();
                false
            }
            Some(first) => {
                let changed = {
                    let mut s = state.write().await;
                    if s.account.as_deref() != Some(first.as_str()) {
                        s.account = Some(first.clone());
                        true
                    } else {
                        false
                    }
                };
                if changed {
                    tracing::info!("Account changed: switched to {}", first);
                    refresh_balance(provider, state).await;
                }
                true
            }
        },
        ProviderEvent::ChainChanged(chain_id) => {
            tracing::info!("Chain changed: {}", chain_id);
            state.write().await.chain_id = Some(chain_id);

            // Nothing here is chain-specific, so a chain switch reloads everything.
            match provider.accounts().await {
                Ok(accounts) if accounts.is_empty() => {
                    *state.write().await = WalletStatus::default();
                    false
                }
                Ok(accounts) => {
                    state.write().await.account = accounts.into_iter().next();
                    refresh_balance(provider, state).await;
                    true
                }
                Err(e) => {
                    tracing::error!("Error reloading accounts after chain change: {}", e);
                    true
                }
            }
        }
        ProviderEvent::Disconnect(reason) => {
            tracing::info!(
                "Wallet disconnected: {}",
                reason.as_deref().unwrap_or("provider closed the connection")
            );
            *state.write().await = WalletStatus::default();
            false
        }
    };

    let account = state.read().await.account.clone();
    publish_account(account_tx, account);
    live
}

/// Sends `account` to watchers unless it is already the current value.
fn publish_account(tx: &watch::Sender<Option<String>>, account: Option<String>) {
    // ---
    tx.send_if_modified(|current| {
        if *current == account {
            return false;
        }
        *current = account;
        true
    });
}

/// Fetches the balance of the active account. A failure clears the balance and
/// records the error, but keeps the account.
async fn refresh_balance(provider: &dyn WalletProvider, state: &RwLock<WalletStatus>) {
    // ---
    let Some(account) = state.read().await.account.clone() else {
        return;
    };

    let result = provider.balance(&account).await;

    let mut s = state.write().await;
    if s.account.as_deref() != Some(account.as_str()) {
        // Account switched while the fetch was in flight.
        return;
    }
    match result {
        Ok(wei) => {
            s.balance = Some(format_ether(wei));
            s.balance_error = None;
        }
        Err(e) => {
            tracing::error!("Error fetching balance for {}: {}", account, e);
            s.balance = None;
            s.balance_error = Some(AttendanceError::BalanceUnavailable(e.to_string()).to_string());
        }
    }
}
