// --- File: crates/slotwise_access/src/handlers.rs ---
//! User management and feature-flag administration endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use slotwise_common::models::{permissions, ActivityLogEntry, FeatureFlag, User};
use slotwise_common::{json_body, not_found, permission_denied, query_params, SlotwiseError};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::feature_flags::FeatureFlagService;
use crate::gate::{AccessGate, NewUser};

pub const PERMISSION_DENIED: &str = "Permission denied";
pub const MISSING_IDENTITY: &str = "Caller identity required";

#[derive(Clone)]
pub struct AccessState {
    pub gate: Arc<AccessGate>,
    pub flags: FeatureFlagService,
}

/// Every endpoint requires an identity; its absence is a denial.
pub fn require_identity(id: Option<Uuid>) -> Result<Uuid, SlotwiseError> {
    id.ok_or_else(|| permission_denied(MISSING_IDENTITY))
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub caller_id: Option<Uuid>,
    pub user: NewUser,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub caller_id: Option<Uuid>,
    pub role_id: Uuid,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CallerQuery {
    pub caller_id: Option<Uuid>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Serialize, Debug, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FlagsQuery {
    pub user_id: Option<Uuid>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetFlagRequest {
    pub user_id: Option<Uuid>,
    pub flag: FeatureFlag,
    pub enabled: bool,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FlagsResponse {
    pub tenant_id: Uuid,
    pub flags: BTreeMap<FeatureFlag, bool>,
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 403, description = "Permission denied")
    ),
    tag = "Users"
))]
pub async fn create_user_handler(
    State(state): State<Arc<AccessState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<User>, SlotwiseError> {
    let payload = json_body(payload)?;
    let caller_id = require_identity(payload.caller_id)?;
    state
        .gate
        .create_user(caller_id, payload.user)
        .await
        .map(Json)
        .ok_or_else(|| permission_denied(PERMISSION_DENIED))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/users/{id}/role",
    params(("id" = Uuid, Path, description = "User to update")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = SuccessResponse),
        (status = 403, description = "Permission denied")
    ),
    tag = "Users"
))]
pub async fn update_user_role_handler(
    State(state): State<Arc<AccessState>>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, SlotwiseError> {
    let payload = json_body(payload)?;
    let caller_id = require_identity(payload.caller_id)?;
    if state
        .gate
        .update_user_role(caller_id, user_id, payload.role_id)
        .await
    {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(permission_denied(PERMISSION_DENIED))
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User to deactivate"), CallerQuery),
    responses(
        (status = 200, description = "User deactivated", body = SuccessResponse),
        (status = 403, description = "Permission denied")
    ),
    tag = "Users"
))]
pub async fn deactivate_user_handler(
    State(state): State<Arc<AccessState>>,
    Path(user_id): Path<Uuid>,
    query: Result<Query<CallerQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, SlotwiseError> {
    let query = query_params(query)?;
    let caller_id = require_identity(query.caller_id)?;
    if state.gate.deactivate_user(caller_id, user_id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(permission_denied(PERMISSION_DENIED))
    }
}

async fn authorize_flag_admin(
    state: &AccessState,
    user_id: Option<Uuid>,
    tenant_id: Uuid,
) -> Result<Uuid, SlotwiseError> {
    let user_id = require_identity(user_id)?;
    if state
        .gate
        .authorize(user_id, permissions::FEATURE_FLAGS_UPDATE, tenant_id)
        .await
    {
        Ok(user_id)
    } else {
        Err(permission_denied(PERMISSION_DENIED))
    }
}

async fn resolved_flags(state: &AccessState, tenant_id: Uuid) -> Result<FlagsResponse, SlotwiseError> {
    let tenant = state
        .gate
        .store()
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;
    Ok(FlagsResponse {
        tenant_id,
        flags: state.flags.flags_for(&tenant).await?,
    })
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/feature-flags/{tenant_id}",
    params(("tenant_id" = Uuid, Path, description = "Tenant"), FlagsQuery),
    responses(
        (status = 200, description = "Resolved flags", body = FlagsResponse),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Admin"
))]
pub async fn get_feature_flags_handler(
    State(state): State<Arc<AccessState>>,
    Path(tenant_id): Path<Uuid>,
    query: Result<Query<FlagsQuery>, QueryRejection>,
) -> Result<Json<FlagsResponse>, SlotwiseError> {
    let query = query_params(query)?;
    authorize_flag_admin(&state, query.user_id, tenant_id).await?;
    resolved_flags(&state, tenant_id).await.map(Json)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/admin/feature-flags/{tenant_id}",
    params(("tenant_id" = Uuid, Path, description = "Tenant")),
    request_body = SetFlagRequest,
    responses(
        (status = 200, description = "Flags after the update", body = FlagsResponse),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Admin"
))]
pub async fn set_feature_flag_handler(
    State(state): State<Arc<AccessState>>,
    Path(tenant_id): Path<Uuid>,
    payload: Result<Json<SetFlagRequest>, JsonRejection>,
) -> Result<Json<FlagsResponse>, SlotwiseError> {
    let payload = json_body(payload)?;
    let user_id = authorize_flag_admin(&state, payload.user_id, tenant_id).await?;
    // Fail before writing an override for a tenant that does not exist.
    resolved_flags(&state, tenant_id).await?;
    state
        .flags
        .set_override(tenant_id, payload.flag, payload.enabled)
        .await?;
    state.gate.log_activity(
        ActivityLogEntry::new(tenant_id, Some(user_id), "feature_flag.updated")
            .resource("feature_flag", payload.flag.as_str())
            .details(serde_json::json!({ "enabled": payload.enabled })),
    );
    resolved_flags(&state, tenant_id).await.map(Json)
}
