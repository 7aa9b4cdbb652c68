use crate::error::AttendanceError;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Notifications pushed by a wallet provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    // ---
    /// The authorized account list changed. Empty means locked or revoked.
    AccountsChanged(Vec<String>),

    /// The provider switched networks; carries the new chain id.
    ChainChanged(String),

    /// The provider went away, with an optional reason.
    Disconnect(Option<String>),
}

/// Abstraction over an Ethereum wallet provider (EIP-1193 style).
///
/// Only identity and balance are read. Nothing is ever signed or submitted.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    // ---
    /// Ask the wallet to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, AttendanceError>;

    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, AttendanceError>;

    /// Current chain id as a hex string (`eth_chainId`).
    async fn chain_id(&self) -> Result<String, AttendanceError>;

    /// Balance of `address` in wei (`eth_getBalance`).
    async fn balance(&self, address: &str) -> Result<u128, AttendanceError>;

    /// Subscribe to provider events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Type alias for any backend that implements WalletProvider.
pub type WalletProviderPtr = Arc<dyn WalletProvider>;
