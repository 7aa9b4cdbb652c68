mod http_source;

pub use http_source::HttpPositionSource;

use crate::domain::PositionSourcePtr;
use std::sync::Arc;

/// Creates a position source backed by an HTTP location service.
pub fn create_http_position_source(url: &str) -> anyhow::Result<PositionSourcePtr> {
    // ---
    tracing::info!("Using HTTP position source at {}", url);
    Ok(Arc::new(HttpPositionSource::new(url)?))
}
