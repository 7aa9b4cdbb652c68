use crate::domain::{GeoPoint, PositionOptions, PositionSource};
use crate::error::AttendanceError;
use anyhow::Result;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Deserialize)]
struct LocationReply {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

/// Position source that asks a location service over HTTP.
///
/// The service answers `GET <url>?enableHighAccuracy=<bool>` with
/// `{"latitude": .., "longitude": ..}`. The last good fix is kept and reused
/// while it is younger than `maximum_age`.
pub struct HttpPositionSource {
    // ---
    client: reqwest::Client,
    url: String,
    last_fix: Mutex<Option<(Instant, GeoPoint)>>,
}

impl HttpPositionSource {
    // ---
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: url.into(),
            last_fix: Mutex::new(None),
        })
    }

    fn cached(&self, options: &PositionOptions) -> Option<GeoPoint> {
        // ---
        if options.maximum_age.is_zero() {
            return None;
        }
        let last = self.last_fix.lock().ok()?;
        match *last {
            Some((taken, point)) if taken.elapsed() <= options.maximum_age => Some(point),
            _ => None,
        }
    }

    fn remember(&self, point: GeoPoint) {
        if let Ok(mut last) = self.last_fix.lock() {
            *last = Some((Instant::now(), point));
        }
    }
}

#[async_trait::async_trait]
impl PositionSource for HttpPositionSource {
    // ---
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<GeoPoint, AttendanceError> {
        // ---
        if let Some(point) = self.cached(options) {
            tracing::debug!("Reusing cached position fix");
            return Ok(point);
        }

        let response = self
            .client
            .get(&self.url)
            .query(&[("enableHighAccuracy", options.enable_high_accuracy)])
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Location service request failed: {}", e);
                if e.is_timeout() {
                    AttendanceError::LocationTimeout
                } else {
                    AttendanceError::LocationUnavailable
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AttendanceError::LocationPermissionDenied)
            }
            status if !status.is_success() => {
                tracing::warn!("Location service answered {}", status);
                return Err(AttendanceError::LocationUnavailable);
            }
            _ => {}
        }

        let reply: LocationReply = response.json().await.map_err(|e| {
            tracing::warn!("Location service sent an unreadable fix: {}", e);
            AttendanceError::LocationUnavailable
        })?;

        let point = GeoPoint::new(reply.latitude, reply.longitude)?;
        self.remember(point);
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/fix")
    }

    fn counting_service(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/fix",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"lat": 30.0085, "lon": 77.76386}))
                }
            }),
        )
    }

    #[tokio::test]
    async fn reads_short_field_names() {
        let url = serve(counting_service(Arc::new(AtomicUsize::new(0)))).await;
        let source = HttpPositionSource::new(url).unwrap();

        let point = source.current_position(&PositionOptions::default()).await.unwrap();
        assert_eq!(point, GeoPoint::new(30.0085, 77.76386).unwrap());
    }

    #[tokio::test]
    async fn maximum_age_controls_reuse() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve(counting_service(hits.clone())).await;
        let source = HttpPositionSource::new(url).unwrap();

        let fresh = PositionOptions::default();
        source.current_position(&fresh).await.unwrap();
        source.current_position(&fresh).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let cached = PositionOptions {
            maximum_age: Duration::from_secs(60),
            ..PositionOptions::default()
        };
        source.current_position(&cached).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forbidden_is_permission_denied() {
        let app = Router::new().route("/fix", get(|| async { AxumStatus::FORBIDDEN }));
        let source = HttpPositionSource::new(serve(app).await).unwrap();

        let result = source.current_position(&PositionOptions::default()).await;
        assert_eq!(result, Err(AttendanceError::LocationPermissionDenied));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let app = Router::new().route("/fix", get(|| async { AxumStatus::SERVICE_UNAVAILABLE }));
        let source = HttpPositionSource::new(serve(app).await).unwrap();

        let result = source.current_position(&PositionOptions::default()).await;
        assert_eq!(result, Err(AttendanceError::LocationUnavailable));
    }
}
