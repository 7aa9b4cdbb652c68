use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Geo Attendance API
Version: {version}

Available endpoints:
  - GET    /subjects           - Subject catalog
  - GET    /key                - Today's check-in key
  - POST   /location/verify    - Check a position fix against the geofence
  - POST   /attendance         - Submit a check-in
  - GET    /attendance         - List check-ins, newest first
  - DELETE /attendance/{{id}}    - Delete a check-in
  - POST   /wallet/connect     - Connect the wallet
  - POST   /wallet/disconnect  - Disconnect the wallet
  - GET    /wallet             - Wallet account, chain and balance
  - GET    /health             - Light health check
  - GET    /health?mode=full   - Full health check (includes the record store)
  - GET    /metrics            - Prometheus metrics
"#
    )
}
