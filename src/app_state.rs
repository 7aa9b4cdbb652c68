//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` contains the
//! record-store backend, the metrics implementation and the check-in
//! registrar, all behind `Arc` so cloning per request is cheap.

use crate::attendance::Registrar;
use crate::domain::{MetricsPtr, StorePtr};
use std::sync::Arc;

/// Shared application state passed to all Axum handlers.
///
/// This struct serves as the Dependency Injection container for the application.
/// It holds all shared resources needed by HTTP handlers and is cloned cheaply
/// for each request via Axum's `State` extractor.
///
/// # Design Principles
///
/// - **Dependency Inversion**: Handlers depend on abstractions (`KeyValueStore`,
///   `Metrics`), not concrete backends (Redis, Prometheus).
/// - **Immutable After Initialization**: State is built once at startup. Mutable
///   check-in state lives inside the registrar's stores and sessions.
///
/// # Lifecycle
///
/// 1. Created once in `build_router()` during application startup
/// 2. Attached to the Axum router via `.with_state(app_state)`
/// 3. Cloned automatically by Axum for each incoming HTTP request
#[derive(Clone)]
pub(crate) struct AppState {
    /// Key-value backend behind the record store. Pinged by the full health check.
    store: StorePtr,

    /// Metrics implementation for recording application events.
    ///
    /// Either Prometheus-backed (production) or no-op (testing/development).
    metrics: MetricsPtr,

    /// Check-in pipeline: geofence, daily key, wallet session and records.
    registrar: Arc<Registrar>,
}

impl AppState {
    // ---

    pub fn new(store: StorePtr, metrics: MetricsPtr, registrar: Arc<Registrar>) -> Self {
        // ---
        AppState {
            store,
            metrics,
            registrar,
        }
    }

    /// Get a reference to the record-store backend.
    pub(crate) fn store(&self) -> &StorePtr {
        // ---
        &self.store
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }

    /// Get a reference to the check-in registrar.
    pub(crate) fn registrar(&self) -> &Registrar {
        // ---
        &self.registrar
    }
}

#[cfg(test)]
mod tests {
    // ---

    use super::*;
    use crate::attendance::{
        today, DailyKeyIssuer, Geofence, GeolocationAcquirer, KeyScope, LocalStore,
        RegistrarOptions, RegistrarParts, WalletSession, ATTENDANCE_RECORDS_KEY,
        WALLET_ADDRESS_KEY,
    };
    use crate::domain::{GeoPoint, PositionOptions};
    use crate::infrastructure::{create_memory_store, create_noop_metrics, create_redis_store};
    use std::time::Duration;

    async fn state_with(store: StorePtr) -> AppState {
        // ---
        let metrics = create_noop_metrics().unwrap();
        let keys = DailyKeyIssuer::new(KeyScope::Session, store.clone(), today()).await;

        let registrar = Registrar::new(RegistrarParts {
            geofence: Geofence::new(GeoPoint::new(30.0085, 77.7639).unwrap(), 10.0),
            acquirer: GeolocationAcquirer::new(PositionOptions::default()),
            fallback_source: None,
            keys: Arc::new(keys),
            records: Arc::new(
                LocalStore::load(store.clone(), ATTENDANCE_RECORDS_KEY, vec![]).await,
            ),
            last_wallet: Arc::new(LocalStore::load(store.clone(), WALLET_ADDRESS_KEY, None).await),
            wallet: Arc::new(WalletSession::new(None)),
            metrics: metrics.clone(),
            options: RegistrarOptions {
                require_wallet: true,
                submit_delay: Duration::ZERO,
            },
        });

        AppState::new(store, metrics, Arc::new(registrar))
    }

    #[tokio::test]
    async fn test_app_state_creation_and_clone() {
        // ---
        let app_state = state_with(create_memory_store()).await;
        let cloned = app_state.clone();

        assert!(Arc::ptr_eq(&app_state.registrar, &cloned.registrar));
        assert!(app_state.store().ping().await.is_ok());
        assert_eq!(app_state.metrics().render(), "");
        assert_eq!(app_state.registrar().geofence().max_distance_km(), 10.0);
        assert!(app_state.registrar().check_storage().is_ok());
    }

    #[tokio::test]
    async fn test_redis_store_failure_is_reported_by_ping() {
        // ---
        let store = create_redis_store("redis://invalid-host:6379").unwrap();
        let app_state = state_with(store).await;

        assert!(app_state.store().ping().await.is_err());
        // Startup survived the unreachable backend by degrading to memory.
        assert!(app_state.registrar().records().await.is_empty());
        assert!(matches!(
            app_state.registrar().check_storage(),
            Err(crate::AttendanceError::StorageError(_))
        ));
    }
}
