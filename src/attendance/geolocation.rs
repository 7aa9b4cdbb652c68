//! One-shot position acquisition with a deadline and a per-requester in-flight guard.

use crate::domain::{GeoPoint, PositionOptions, PositionSource};
use crate::error::AttendanceError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Requests position fixes from a [`PositionSource`].
///
/// Each requester (a wallet address, or any caller-chosen key) may have exactly
/// one fix in flight; an overlapping request fails with `LocationRequestPending`
/// instead of being queued. There is no retry: callers surface the error and
/// let the user try again.
///
/// Acquisition is cancelled by dropping the returned future, for example when
/// the HTTP client goes away. The in-flight slot is released either way.
pub struct GeolocationAcquirer {
    // ---
    options: PositionOptions,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Releases a requester's in-flight slot on drop.
struct InFlightGuard {
    requester: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.requester);
        }
    }
}

impl GeolocationAcquirer {
    // ---
    pub fn new(options: PositionOptions) -> Self {
        // ---
        Self {
            options,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Takes one fix from `source` for `requester`, bounded by the configured timeout.
    #[tracing::instrument(skip(self, source))]
    pub async fn acquire(
        &self,
        requester: &str,
        source: &dyn PositionSource,
    ) -> Result<GeoPoint, AttendanceError> {
        // ---
        let _guard = self.begin(requester)?;

        tracing::debug!("Attempting to get location...");
        let fix = source.current_position(&self.options);
        match tokio::time::timeout(self.options.timeout, fix).await {
            Ok(Ok(point)) => {
                tracing::debug!("Location acquired: {:?}", point);
                Ok(point)
            }
            Ok(Err(e)) => {
                tracing::warn!("Location error: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!("Location request timed out after {:?}", self.options.timeout);
                Err(AttendanceError::LocationTimeout)
            }
        }
    }

    fn begin(&self, requester: &str) -> Result<InFlightGuard, AttendanceError> {
        // ---
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| AttendanceError::LocationUnknown)?;

        if !set.insert(requester.to_string()) {
            return Err(AttendanceError::LocationRequestPending);
        }

        Ok(InFlightGuard {
            requester: requester.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }
}
