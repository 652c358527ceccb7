//! Prometheus recorder, `/metrics` endpoints and request latency middleware.

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::histogram;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use tracing::warn;

static PROMETHEUS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

#[derive(Clone)]
pub struct MetricsState {
    handle: Option<PrometheusHandle>,
}

impl MetricsState {
    /// Installs the global recorder on first use.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        let handle = PROMETHEUS_HANDLE.get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| warn!("Prometheus recorder not installed: {}", e))
                .ok()
        });
        Self {
            handle: handle.clone(),
        }
    }

    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(|h| h.render())
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }
}

/// Turns Prometheus text into `{"series{labels}": value}`.
pub fn exposition_to_json(text: &str) -> Value {
    let mut series = Map::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.rsplit_once(' ') {
            if let Ok(number) = value.parse::<f64>() {
                series.insert(key.to_string(), json!(number));
            }
        }
    }
    Value::Object(series)
}

pub async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    match state.render() {
        Some(metrics) => (StatusCode::OK, metrics).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not enabled").into_response(),
    }
}

pub async fn metrics_json_handler(State(state): State<MetricsState>) -> Response {
    match state.render() {
        Some(metrics) => Json(exposition_to_json(&metrics)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Metrics not enabled" })),
        )
            .into_response(),
    }
}

pub fn routes(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/metrics/json", get(metrics_json_handler))
        .with_state(state)
}

/// Records `slotwise_http_request_duration_seconds` per route template.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    histogram!(
        "slotwise_http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => response.status().as_u16().to_string()
    )
    .record(start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_state_renders_nothing() {
        let state = MetricsState::disabled();
        assert!(!state.is_enabled());
        assert!(state.render().is_none());
    }

    #[test]
    fn exposition_lines_become_json() {
        let text = "# HELP slotwise_appointments_created_total x\n\
                    # TYPE slotwise_appointments_created_total counter\n\
                    slotwise_appointments_created_total{synced=\"true\"} 3\n\
                    slotwise_http_request_duration_seconds_sum 0.25\n";
        let value = exposition_to_json(text);
        assert_eq!(value["slotwise_appointments_created_total{synced=\"true\"}"], 3.0);
        assert_eq!(value["slotwise_http_request_duration_seconds_sum"], 0.25);
        assert_eq!(value.as_object().unwrap().len(), 2);
    }
}
