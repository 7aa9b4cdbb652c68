//! Ethereum JSON-RPC wallet provider over HTTP.

use crate::domain::{ProviderEvent, WalletProvider};
use crate::error::AttendanceError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// EIP-1193 "user rejected the request".
const USER_REJECTED: i64 = 4001;
/// MetaMask "request already pending".
const REQUEST_PENDING: i64 = -32002;
/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

enum RpcFailure {
    Transport(String),
    Rpc { code: i64, message: String },
}

impl From<RpcFailure> for AttendanceError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Rpc {
                code: USER_REJECTED,
                ..
            } => AttendanceError::WalletRejected,
            RpcFailure::Rpc {
                code: REQUEST_PENDING,
                ..
            } => AttendanceError::WalletRequestPending,
            RpcFailure::Rpc { code, message } => {
                AttendanceError::WalletProvider(format!("{message} (code {code})"))
            }
            RpcFailure::Transport(message) => AttendanceError::WalletProvider(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    accounts: Vec<String>,
    chain_id: String,
}

/// Wallet provider that talks JSON-RPC to a node or wallet bridge.
///
/// HTTP has no push channel, so account and chain changes are detected by
/// polling (see [`JsonRpcProvider::spawn_poller`]) and re-published as
/// [`ProviderEvent`]s.
pub struct JsonRpcProvider {
    // ---
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
    last_seen: Mutex<Option<Snapshot>>,
    reachable: AtomicBool,
}

impl JsonRpcProvider {
    // ---
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        // ---
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            events,
            last_seen: Mutex::new(None),
            reachable: AtomicBool::new(true),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        // ---
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{method}: {e}")))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{method}: invalid response: {e}")))?;

        if let Some(err) = body.error {
            return Err(RpcFailure::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| RpcFailure::Transport(format!("{method}: response has no result")))
    }

    async fn call_as<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, AttendanceError> {
        // ---
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            AttendanceError::WalletProvider(format!("{method}: unexpected result: {e}"))
        })
    }

    /// Compares accounts and chain with the previous poll and publishes changes.
    pub async fn poll(&self) -> Result<(), AttendanceError> {
        // ---
        let current = Snapshot {
            accounts: self.accounts().await?,
            chain_id: self.chain_id().await?,
        };

        let mut last = self.last_seen.lock().await;
        if let Some(previous) = last.as_ref() {
            if previous.chain_id != current.chain_id {
                let _ = self.events.send(ProviderEvent::ChainChanged(current.chain_id.clone()));
            }
            if previous.accounts != current.accounts {
                let _ = self
                    .events
                    .send(ProviderEvent::AccountsChanged(current.accounts.clone()));
            }
        }
        *last = Some(current);
        Ok(())
    }

    /// Polls every `interval` until the provider is dropped. Losing the
    /// endpoint publishes one `Disconnect`.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        // ---
        let provider = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(provider) = provider.upgrade() else {
                    break;
                };

                match provider.poll().await {
                    Ok(()) => {
                        if !provider.reachable.swap(true, Ordering::Relaxed) {
                            tracing::info!("Wallet provider reachable again");
                        }
                    }
                    Err(e) => {
                        if provider.reachable.swap(false, Ordering::Relaxed) {
                            tracing::error!("Wallet provider unreachable: {}", e);
                            *provider.last_seen.lock().await = None;
                            let event = ProviderEvent::Disconnect(Some(e.to_string()));
                            let _ = provider.events.send(event);
                        }
                    }
                }
            }
        })
    }
}

/// Parses a JSON-RPC hex quantity such as `0x1bc16d674ec80000`.
fn parse_quantity(hex: &str) -> Result<u128, AttendanceError> {
    // ---
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| AttendanceError::WalletProvider(format!("not a hex quantity: {hex}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| AttendanceError::WalletProvider(format!("bad quantity {hex}: {e}")))
}

#[async_trait::async_trait]
impl WalletProvider for JsonRpcProvider {
    // ---
    async fn request_accounts(&self) -> Result<Vec<String>, AttendanceError> {
        // ---
        match self.call("eth_requestAccounts", json!([])).await {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| AttendanceError::WalletProvider(format!("eth_requestAccounts: {e}"))),
            // Plain nodes have no authorization step; their accounts are already exposed.
            Err(RpcFailure::Rpc {
                code: METHOD_NOT_FOUND,
                ..
            }) => self.accounts().await,
            Err(failure) => Err(failure.into()),
        }
    }

    async fn accounts(&self) -> Result<Vec<String>, AttendanceError> {
        self.call_as("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<String, AttendanceError> {
        self.call_as("eth_chainId", json!([])).await
    }

    async fn balance(&self, address: &str) -> Result<u128, AttendanceError> {
        // ---
        let hex: String = self.call_as("eth_getBalance", json!([address, "latest"])).await?;
        parse_quantity(&hex)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
