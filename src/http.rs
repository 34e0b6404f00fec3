use crate::metrics::Metrics;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use std::sync::Arc;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

pub fn build_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// `ok` once the monitor loop has completed a tick, `starting` before.
async fn healthz(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    if metrics.monitor_ticks_total.get() > 0.0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.encode_metrics() {
        Ok(encoded) => ([(CONTENT_TYPE, PROMETHEUS_TEXT)], encoded).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MetricSample;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    async fn get_path(metrics: Arc<Metrics>, path: &str) -> (StatusCode, Option<String>, String) {
        let response = build_router(metrics)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_waits_for_first_tick() {
        let metrics = Metrics::new().unwrap();
        let (status, _, body) = get_path(metrics.clone(), "/healthz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "starting");

        metrics.record_tick(&MetricSample::default(), Utc::now());
        let (status, _, body) = get_path(metrics, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn metrics_route_exports_suppression_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_suppressed();

        let (status, content_type, body) = get_path(metrics, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(PROMETHEUS_TEXT));
        assert!(body.contains("monitor_ticks_total 0"));
        assert!(body.contains("monitor_alerts_suppressed_total 1"));
    }
}
