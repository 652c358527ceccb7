// --- File: crates/slotwise_common/src/http.rs ---
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

use crate::error::{validation_error, HttpStatusCode, SlotwiseError};

pub mod client;

/// Message shown in place of server-side failure details.
pub const SANITIZED_MESSAGE: &str = "Internal server error";

static DETAILED_ERRORS: AtomicBool = AtomicBool::new(true);

/// Controls whether 5xx bodies carry the underlying error text.
/// The backend turns this off in production.
pub fn set_detailed_errors(enabled: bool) {
    DETAILED_ERRORS.store(enabled, Ordering::Relaxed);
}

pub fn detailed_errors() -> bool {
    DETAILED_ERRORS.load(Ordering::Relaxed)
}

/// Error body shared by every endpoint.
pub fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Extension trait for SlotwiseError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for SlotwiseError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status_code.is_server_error() {
            error!("request failed with {}: {}", status_code.as_u16(), self);
            match self {
                SlotwiseError::Decryption(_) => SANITIZED_MESSAGE.to_string(),
                _ if !detailed_errors() => SANITIZED_MESSAGE.to_string(),
                other => other.to_string(),
            }
        } else {
            self.to_string()
        };

        error_body(status_code, message)
    }
}

impl IntoResponse for SlotwiseError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Unwraps a JSON body, turning axum's rejection into a 400 `{"error": ...}`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, SlotwiseError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

/// Same as [`json_body`] for query strings.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, SlotwiseError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| validation_error(rejection.body_text()))
}
