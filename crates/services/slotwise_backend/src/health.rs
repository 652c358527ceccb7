//! Health check handlers.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use slotwise_db::Datastore;
use std::sync::Arc;

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub datastore: ComponentStatus,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentStatus {
    pub fn up(latency_ms: u64) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "slotwise".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn ready_check(
    State(store): State<Arc<dyn Datastore>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = std::time::Instant::now();
    let datastore = match store.ping().await {
        Ok(()) => ComponentStatus::up(start.elapsed().as_millis() as u64),
        Err(e) => ComponentStatus::down(e.to_string()),
    };

    if datastore.is_up() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                datastore,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                datastore,
            }),
        )
    }
}

pub async fn live_check() -> StatusCode {
    StatusCode::OK
}

pub fn routes(store: Arc<dyn Datastore>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(ready_check))
        .route("/health/live", get(live_check))
        .with_state(store)
}
