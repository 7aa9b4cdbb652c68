// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use attendance::{
    today, DailyKeyIssuer, Geofence, GeolocationAcquirer, LocalStore, Registrar, RegistrarOptions,
    RegistrarParts, WalletSession, ATTENDANCE_RECORDS_KEY, WALLET_ADDRESS_KEY,
};
use handlers::*;

// Public exports (visible outside this module)
pub mod attendance;
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod error;
mod handlers;
mod infrastructure;

pub use config::*;
pub use error::AttendanceError;

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    create_http_position_source, // ---
    create_json_rpc_provider,
    create_memory_store,
    create_noop_metrics,
    create_prom_metrics,
    create_redis_store,
};

/// Build the HTTP router with configuration taken from environment variables.
pub async fn create_router() -> Result<Router> {
    // ---
    let config = AppConfig::from_env()?;
    build_router(config).await
}

/// Build the HTTP router from an explicit configuration.
pub async fn build_router(config: AppConfig) -> Result<Router> {
    // ---
    tracing_subscriber::fmt::try_init().ok(); // Ignores if already initialized

    let metrics = match config.server.metrics {
        MetricsType::Prometheus => create_prom_metrics()?,
        MetricsType::Noop => create_noop_metrics()?,
    };

    // Create infrastructure dependencies
    let store = match &config.store.backend {
        StoreBackend::Memory => create_memory_store(),
        StoreBackend::Redis { url } => create_redis_store(url)?,
    };
    let fallback_source = config
        .geolocation
        .provider_url
        .as_deref()
        .map(create_http_position_source)
        .transpose()?;
    let wallet_provider = config
        .wallet
        .rpc_url
        .as_deref()
        .map(|url| create_json_rpc_provider(url, config.wallet.poll_interval))
        .transpose()?;
    if wallet_provider.is_none() {
        tracing::warn!("No wallet provider configured; wallet connect will fail");
    }

    let keys = DailyKeyIssuer::new(config.checkin.key_scope, store.clone(), today()).await;
    let records =
        Arc::new(LocalStore::load(store.clone(), ATTENDANCE_RECORDS_KEY, Vec::new()).await);
    let last_wallet = Arc::new(LocalStore::load(store.clone(), WALLET_ADDRESS_KEY, None).await);

    // Pick up writes made through other handles on the same backend.
    let _ = records.watch();
    let _ = last_wallet.watch();

    let registrar = Registrar::new(RegistrarParts {
        geofence: Geofence::new(config.geofence.reference, config.geofence.max_distance_km),
        acquirer: GeolocationAcquirer::new(config.geolocation.options.clone()),
        fallback_source,
        keys: Arc::new(keys),
        records,
        last_wallet,
        wallet: Arc::new(WalletSession::new(wallet_provider)),
        metrics: metrics.clone(),
        options: RegistrarOptions {
            require_wallet: config.checkin.require_wallet,
            submit_delay: config.checkin.submit_delay,
        },
    });

    // Build application state with all dependencies
    let app_state = AppState::new(store, metrics, Arc::new(registrar));

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/subjects", get(list_subjects))
        .route("/key", get(current_key))
        .route("/location/verify", post(verify_location))
        .route("/attendance", post(submit_attendance).get(list_attendance))
        .route("/attendance/{id}", delete(delete_attendance))
        .route("/wallet", get(wallet_status))
        .route("/wallet/connect", post(connect_wallet))
        .route("/wallet/disconnect", post(disconnect_wallet))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_http_requests,
        ))
        .with_state(app_state);

    tracing::info!(
        "Router ready: geofence {:?} within {} km",
        config.geofence.reference,
        config.geofence.max_distance_km
    );
    Ok(router)
}
