// File: crates/slotwise_booking/src/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use slotwise_access::require_identity;
use slotwise_common::models::{Appointment, NewAppointment};
use slotwise_common::{json_body, query_params, validation_error, SlotwiseError};
use std::sync::Arc;
use uuid::Uuid;

use crate::orchestrator::{BookingOrchestrator, Caller, CreatedAppointment};

#[derive(Clone)]
pub struct BookingState {
    pub orchestrator: Arc<BookingOrchestrator>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub appointment: NewAppointment,
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Serialize, Debug)]
pub struct AppointmentList {
    pub appointments: Vec<Appointment>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Serialize, Debug, PartialEq)]
pub struct DeleteResponse {
    pub success: bool,
}

fn require_tenant(tenant_id: Option<Uuid>) -> Result<Uuid, SlotwiseError> {
    tenant_id.ok_or_else(|| validation_error("Missing tenantId"))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment stored; calendar sync reported separately", body = CreatedAppointment),
        (status = 400, description = "Malformed body or missing tenantId"),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Tenant not found"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Appointments"
))]
pub async fn create_appointment_handler(
    State(state): State<Arc<BookingState>>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<Json<CreatedAppointment>, SlotwiseError> {
    let payload = json_body(payload)?;
    let user_id = require_identity(payload.user_id)?;
    let tenant_id = require_tenant(payload.tenant_id)?;
    state
        .orchestrator
        .create_appointment(Caller::User(user_id), tenant_id, payload.appointment)
        .await
        .map(Json)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/appointments/{tenant_id}",
    params(("tenant_id" = Uuid, Path, description = "Tenant whose appointments to list"), ListQuery),
    responses(
        (status = 200, description = "Appointments by start time", body = AppointmentList),
        (status = 403, description = "Permission denied"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Appointments"
))]
pub async fn list_appointments_handler(
    State(state): State<Arc<BookingState>>,
    Path(tenant_id): Path<Uuid>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<AppointmentList>, SlotwiseError> {
    let query = query_params(query)?;
    let user_id = require_identity(query.user_id)?;
    let appointments = state
        .orchestrator
        .list_appointments(Caller::User(user_id), tenant_id)
        .await?;
    Ok(Json(AppointmentList { appointments }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment to delete"), DeleteQuery),
    responses(
        (status = 200, description = "Appointment deleted", body = DeleteResponse),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Appointment not found"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Appointments"
))]
pub async fn delete_appointment_handler(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<Uuid>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, SlotwiseError> {
    let query = query_params(query)?;
    let user_id = require_identity(query.user_id)?;
    let tenant_id = require_tenant(query.tenant_id)?;
    state
        .orchestrator
        .delete_appointment(Caller::User(user_id), tenant_id, appointment_id)
        .await?;
    Ok(Json(DeleteResponse { success: true }))
}
