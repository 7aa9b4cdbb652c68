mod json_rpc;

pub use json_rpc::JsonRpcProvider;

use crate::domain::WalletProviderPtr;
use std::sync::Arc;
use std::time::Duration;

/// Creates a JSON-RPC wallet provider and starts its change poller.
///
/// The poller holds only a weak reference, so it stops once the last
/// `WalletProviderPtr` is dropped.
pub fn create_json_rpc_provider(
    url: &str,
    poll_interval: Duration,
) -> anyhow::Result<WalletProviderPtr> {
    // ---
    tracing::info!("Using JSON-RPC wallet provider at {}", url);
    let provider = Arc::new(JsonRpcProvider::new(url, Duration::from_secs(10))?);
    provider.spawn_poller(poll_interval);
    Ok(provider)
}
