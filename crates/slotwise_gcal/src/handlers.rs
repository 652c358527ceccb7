// File: crates/slotwise_gcal/src/handlers.rs
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_common::services::{CalendarError, CalendarProvider};
use slotwise_common::{internal_error, json_body, not_found, validation_error, SlotwiseError};
use slotwise_db::Datastore;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Accepted length of an authorization code, inclusive.
pub const CODE_LENGTH: std::ops::RangeInclusive<usize> = 20..=200;

pub const NOT_CONNECTED: &str = "Google Calendar not connected";

// Shared state needed by the calendar handlers
#[derive(Clone)]
pub struct GcalState {
    pub calendar: Arc<dyn CalendarProvider>,
    pub store: Arc<dyn Datastore>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityRequest {
    pub tenant_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub is_available: bool,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub tenant_id: Uuid,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Only the hyphenated 36-character form is accepted.
fn parse_tenant_id(raw: &str) -> Option<Uuid> {
    if raw.len() != 36 {
        return None;
    }
    Uuid::parse_str(raw).ok()
}

/// Checks run in a fixed order so the first failing rule decides the message.
pub fn validate_callback(request: &OAuthCallbackRequest) -> Result<(String, Uuid), SlotwiseError> {
    let (code, tenant_id) = match (request.code.as_deref(), request.tenant_id.as_deref()) {
        (Some(code), Some(tenant)) if !code.is_empty() && !tenant.is_empty() => (code, tenant),
        _ => return Err(validation_error("Missing code or tenantId")),
    };
    if !CODE_LENGTH.contains(&code.len()) {
        return Err(validation_error("Invalid authorization code format"));
    }
    let tenant_id =
        parse_tenant_id(tenant_id).ok_or_else(|| validation_error("Invalid tenant ID format"))?;
    Ok((code.to_string(), tenant_id))
}

/// Stores a refreshed token; failure only costs a refresh on the next call.
pub async fn persist_rotated_token(store: &dyn Datastore, tenant_id: Uuid, rotated: Option<String>) {
    if let Some(blob) = rotated {
        if let Err(e) = store.set_calendar_token(tenant_id, Some(&blob), true).await {
            warn!(%tenant_id, "Failed to store refreshed calendar token: {}", e);
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/calendar/auth-url",
    responses(
        (status = 200, description = "Google consent URL", body = AuthUrlResponse),
        (status = 500, description = "OAuth client not configured")
    ),
    tag = "Calendar"
))]
pub async fn auth_url_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<AuthUrlResponse>, SlotwiseError> {
    let auth_url = state.calendar.auth_url()?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/calendar/oauth-callback",
    request_body = OAuthCallbackRequest,
    responses(
        (status = 200, description = "Calendar connected", body = ConnectResponse),
        (status = 400, description = "Missing or malformed code or tenant id"),
        (status = 404, description = "Tenant not found"),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Exchange or storage failed")
    ),
    tag = "Calendar"
))]
pub async fn oauth_callback_handler(
    State(state): State<Arc<GcalState>>,
    payload: Result<Json<OAuthCallbackRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>, SlotwiseError> {
    // An unreadable body is treated like one without code or tenant.
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let (code, tenant_id) = validate_callback(&request)?;

    state
        .store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;

    let blob = state.calendar.tokens_from_code(&code).await.map_err(|e| {
        error!(%tenant_id, "Calendar connection failed: {}", e);
        internal_error(format!("Failed to connect Google Calendar: {e}"))
    })?;

    if !state
        .store
        .set_calendar_token(tenant_id, Some(&blob), true)
        .await?
    {
        return Err(not_found("Tenant not found"));
    }

    info!(%tenant_id, "Google Calendar connected");
    Ok(Json(ConnectResponse {
        success: true,
        message: "Google Calendar connected successfully".to_string(),
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/calendar/check-availability",
    request_body = CheckAvailabilityRequest,
    responses(
        (status = 200, description = "Whether the window is free", body = AvailabilityResponse),
        (status = 400, description = "Google Calendar not connected or invalid window"),
        (status = 404, description = "Tenant not found"),
        (status = 500, description = "Calendar query failed")
    ),
    tag = "Calendar"
))]
pub async fn check_availability_handler(
    State(state): State<Arc<GcalState>>,
    request: Result<Json<CheckAvailabilityRequest>, JsonRejection>,
) -> Result<Json<AvailabilityResponse>, SlotwiseError> {
    let request = json_body(request)?;
    if request.end_time <= request.start_time {
        return Err(validation_error("endTime must be after startTime"));
    }

    let tenant = state
        .store
        .get_tenant(request.tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;
    let blob = tenant
        .calendar_token()
        .ok_or_else(|| validation_error(NOT_CONNECTED))?;

    let result = state
        .calendar
        .check_availability(
            blob,
            request.start_time,
            request.end_time,
            state.calendar.calendar_id(),
        )
        .await
        .map_err(|e| {
            error!(tenant_id = %tenant.id, "Availability check failed: {}", e);
            match e {
                CalendarError::Sync(msg) => {
                    internal_error(format!("Failed to check availability: {msg}"))
                }
                other => other.into(),
            }
        })?;
    persist_rotated_token(state.store.as_ref(), tenant.id, result.rotated_token).await;

    Ok(Json(AvailabilityResponse {
        is_available: result.value,
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/calendar/disconnect",
    request_body = DisconnectRequest,
    responses(
        (status = 200, description = "Token removed and sync disabled", body = DisconnectResponse),
        (status = 404, description = "Tenant not found"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Calendar"
))]
pub async fn disconnect_handler(
    State(state): State<Arc<GcalState>>,
    request: Result<Json<DisconnectRequest>, JsonRejection>,
) -> Result<Json<DisconnectResponse>, SlotwiseError> {
    let request = json_body(request)?;
    if !state
        .store
        .set_calendar_token(request.tenant_id, None, false)
        .await?
    {
        return Err(not_found("Tenant not found"));
    }
    info!(tenant_id = %request.tenant_id, "Google Calendar disconnected");
    Ok(Json(DisconnectResponse { success: true }))
}
